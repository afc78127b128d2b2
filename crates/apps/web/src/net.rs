use std::time::Duration;

use controller::DatasetFetcher;
use gloo_net::http::Request;
use results::{ImageLoadError, ImageLoader, LookupError, TaxonLookup, Timer};
use results::{parse_taxa_response, taxa_query_url};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlImageElement;

pub fn js_error(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

async fn get_bytes(url: &str) -> Result<Vec<u8>, String> {
    let resp = Request::get(url).send().await.map_err(|e| e.to_string())?;
    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }
    resp.binary().await.map_err(|e| e.to_string())
}

pub struct HttpFetcher;

impl DatasetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        get_bytes(url).await
    }
}

pub struct HttpTaxonLookup {
    pub endpoint: String,
}

impl TaxonLookup for HttpTaxonLookup {
    async fn lookup(&self, scientific_name: &str) -> Result<Option<String>, LookupError> {
        let url = taxa_query_url(&self.endpoint, scientific_name)?;
        let resp = Request::get(url.as_str())
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;
        if !resp.ok() {
            return Err(LookupError::Status(resp.status()));
        }
        let body = resp
            .binary()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;
        parse_taxa_response(&body)
    }
}

/// Waits for the browser to fetch and decode the image.
pub struct DomImageLoader;

impl ImageLoader for DomImageLoader {
    async fn load(&self, url: &str) -> Result<(), ImageLoadError> {
        let fail = |e: JsValue| ImageLoadError {
            url: url.to_string(),
            reason: js_error(&e),
        };
        let img = HtmlImageElement::new().map_err(fail)?;
        img.set_src(url);
        JsFuture::from(img.decode()).await.map_err(fail)?;
        Ok(())
    }
}

/// `setTimeout` wrapped in a promise.
pub struct WindowTimer;

impl Timer for WindowTimer {
    async fn sleep(&self, duration: Duration) {
        let ms = duration.as_millis().min(i32::MAX as u128) as i32;
        let promise = js_sys::Promise::new(&mut |resolve, _| {
            if let Some(window) = web_sys::window() {
                let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms);
            }
        });
        let _ = JsFuture::from(promise).await;
    }
}
