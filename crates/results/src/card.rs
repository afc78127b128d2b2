use chrono::{DateTime, NaiveDate, NaiveDateTime};
use formats::PointFeature;
use serde::Serialize;

pub const DEFAULT_IMAGE: &str = "./img/default_bird.png";
pub const ATTRIBUTION: &str = "Macaulay Library at the Cornell Lab";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    Complete,
    /// Lookup or image load failed; the default image stands in.
    Fallback,
    /// Nothing resolved before the per-card deadline.
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultCard {
    pub feature_index: usize,
    pub image: String,
    pub scientific_name: String,
    pub common_name: String,
    pub date: String,
    pub audio: String,
    pub creator: String,
    pub source_url: String,
    pub asset_id: String,
    pub status: CardStatus,
}

impl ResultCard {
    pub fn new(feature: &PointFeature, image: impl Into<String>, status: CardStatus) -> Self {
        Self {
            feature_index: feature.index,
            image: image.into(),
            scientific_name: feature.scientific_name.clone(),
            common_name: feature.common_name.clone(),
            date: format_recording_date(&feature.date_created),
            audio: feature.audio.clone(),
            creator: feature.creator.clone(),
            source_url: feature.url.clone(),
            asset_id: feature.asset_id().to_string(),
            status,
        }
    }

    pub fn to_html(&self) -> String {
        let mut html = String::with_capacity(640);
        html.push_str("<dt>");
        html.push_str(&format!(
            r#"<img style="max-width: 75px; float: left; margin: 4px" src="{}" alt="" />"#,
            escape_html(&self.image)
        ));
        html.push_str(&format!(
            r#"<small style="font-size: 10px">{}</small>"#,
            escape_html(&self.scientific_name)
        ));
        html.push_str(&format!(
            r#"<h5 style="margin: 4px 0">{}</h5>"#,
            escape_html(&self.common_name)
        ));
        html.push_str(&format!(
            r#"<time style="font-size: 10px">{}</time>"#,
            escape_html(&self.date)
        ));
        if self.status == CardStatus::TimedOut {
            html.push_str(
                r#"<div style="font-size: 10px; color: #a33">Species photo unavailable</div>"#,
            );
        }
        html.push_str("</dt><dd>");
        html.push_str(&format!(
            r#"<audio controls><source src="{}"></audio>"#,
            escape_html(&self.audio)
        ));
        html.push_str(&format!(
            r#"<cite>{} / {} (<a href="{}">ML{}</a>)</cite>"#,
            escape_html(&self.creator),
            ATTRIBUTION,
            escape_html(&self.source_url),
            escape_html(&self.asset_id)
        ));
        html.push_str("</dd>");
        html
    }
}

pub fn truncation_notice_html(shown: usize) -> String {
    format!(
        r#"<div style="font-size: 12px; text-align: center; padding: 4px; background: lightyellow">Note: only the first {shown} results shown</div>"#
    )
}

/// `"2014-07-02"` -> `"Wed Jul 02 2014"`. Unparseable input comes back as-is.
pub fn format_recording_date(raw: &str) -> String {
    let raw = raw.trim();
    parse_recording_date(raw)
        .map(|d| d.format("%a %b %d %Y").to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn parse_recording_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use formats::Dataset;
    use pretty_assertions::assert_eq;

    fn robin() -> PointFeature {
        let payload = include_str!("../../apps/web/assets/data/macaulaylibrary.geojson");
        Dataset::from_geojson_str(payload).unwrap().features[0].clone()
    }

    #[test]
    fn formats_dates_like_to_date_string() {
        assert_eq!(format_recording_date("2014-07-02"), "Wed Jul 02 2014");
        assert_eq!(
            format_recording_date("2019-04-21T06:15:00Z"),
            "Sun Apr 21 2019"
        );
        assert_eq!(
            format_recording_date("2016-03-14T07:30:00.000"),
            "Mon Mar 14 2016"
        );
        assert_eq!(format_recording_date("spring 1998"), "spring 1998");
    }

    #[test]
    fn card_carries_citation_and_asset_id() {
        let card = ResultCard::new(&robin(), "https://example.org/robin.jpg", CardStatus::Complete);
        assert_eq!(card.asset_id, "100001");
        assert_eq!(card.date, "Tue Jul 01 2014");

        let html = card.to_html();
        assert!(html.contains(r#"src="https://example.org/robin.jpg""#));
        assert!(html.contains("<small style=\"font-size: 10px\">Turdus migratorius</small>"));
        assert!(html.contains("<h5 style=\"margin: 4px 0\">American Robin</h5>"));
        assert!(html.contains(
            r#"<source src="https://cdn.download.ams.birds.cornell.edu/api/v1/asset/100001/audio">"#
        ));
        assert!(html.contains(
            r#"Wil Hershberger / Macaulay Library at the Cornell Lab (<a href="https://macaulaylibrary.org/asset/100001">ML100001</a>)"#
        ));
        assert!(!html.contains("unavailable"));
    }

    #[test]
    fn markup_is_escaped() {
        let mut feature = robin();
        feature.common_name = "<script>alert(1)</script>".to_string();
        feature.creator = "O'Brien & Sons".to_string();
        let html = ResultCard::new(&feature, DEFAULT_IMAGE, CardStatus::Fallback).to_html();
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("O&#39;Brien &amp; Sons"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn timed_out_card_flags_missing_photo() {
        let html = ResultCard::new(&robin(), DEFAULT_IMAGE, CardStatus::TimedOut).to_html();
        assert!(html.contains("Species photo unavailable"));
        assert!(html.contains(DEFAULT_IMAGE));
    }

    #[test]
    fn notice_names_the_cap() {
        assert!(truncation_notice_html(10).contains("only the first 10 results shown"));
    }
}
