use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use controller::{ClickOutcome, MapConfig, MapController, Viewport, fetch_dataset};
use formats::Dataset;
use foundation::math::mercator_to_lon_lat;
use layers::symbology::MarkerText;
use reqwest::Client;
use results::{CardRenderer, RenderRequest, RenderedBatch, TaxonLookup};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod http;

use http::{AnyFetcher, CheckingImageLoader, OfflineLookup, ReqwestTaxonLookup, TokioTimer};

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and exercise the bird recordings map from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct ViewArgs {
    #[arg(long, default_value_t = 1.0)]
    zoom: f64,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    center_lon: f64,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    center_lat: f64,

    /// Viewport width in pixels
    #[arg(long, default_value_t = 1280.0)]
    width: f64,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 720.0)]
    height: f64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize a dataset file (gzip or plain GeoJSON, path or URL)
    Inspect { dataset: String },

    /// List clusters for a view
    Clusters {
        dataset: String,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Click a pixel and print what the map would do
    Click {
        dataset: String,

        #[command(flatten)]
        view: ViewArgs,

        #[arg(long)]
        x: f64,

        #[arg(long)]
        y: f64,

        /// Skip species photo lookups
        #[arg(long)]
        offline: bool,

        /// Directory that relative image paths resolve against
        #[arg(long, default_value = "crates/apps/web/assets")]
        assets: PathBuf,
    },
}

#[derive(Debug, Serialize)]
struct DatasetSummary {
    features: usize,
    locations: usize,
    species: usize,
    /// `[min_lon, min_lat, max_lon, max_lat]`
    bbox: Option<[f64; 4]>,
}

#[derive(Debug, Serialize)]
struct ClusterRow {
    members: usize,
    lon_lat: [f64; 2],
    pixel: [f64; 2],
    label: String,
    location_label: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn real_main() -> Result<(), String> {
    let cli = Cli::parse();
    let config = MapConfig::default()
        .with_env_overrides(|k| env::var(k).ok())
        .map_err(|e| e.to_string())?;
    let client = Client::new();

    match cli.command {
        Command::Inspect { dataset } => {
            let dataset = load(&client, &dataset).await?;
            print_json(&summarize(&dataset))
        }
        Command::Clusters { dataset, view } => {
            let dataset = load(&client, &dataset).await?;
            let mut controller = controller_for(config, &view, dataset)?;
            for row in cluster_rows(&mut controller) {
                print_json(&row)?;
            }
            Ok(())
        }
        Command::Click {
            dataset,
            view,
            x,
            y,
            offline,
            assets,
        } => {
            let dataset = load(&client, &dataset).await?;
            let taxa_endpoint = config.taxa_endpoint.clone();
            let mut controller = controller_for(config, &view, dataset)?;
            match controller.click([x, y]) {
                ClickOutcome::Ignored => {
                    eprintln!("no cluster at ({x}, {y})");
                    Ok(())
                }
                ClickOutcome::ZoomToExtent(fit) => {
                    let [lon, lat] = mercator_to_lon_lat(fit.target.center);
                    eprintln!(
                        "zoom to extent: zoom {:.3} center {lat:.4}, {lon:.4}",
                        fit.target.zoom
                    );
                    Ok(())
                }
                ClickOutcome::ShowResults { request, .. } => {
                    let images = CheckingImageLoader {
                        client: client.clone(),
                        assets,
                    };
                    let batch = if offline {
                        render(&controller, OfflineLookup, images, request).await
                    } else {
                        let lookup = ReqwestTaxonLookup {
                            client,
                            endpoint: taxa_endpoint,
                        };
                        render(&controller, lookup, images, request).await
                    };
                    if !controller.complete_render(batch) {
                        return Err("render batch went stale".to_string());
                    }
                    println!("{}", controller.panel().to_html());
                    Ok(())
                }
            }
        }
    }
}

async fn load(client: &Client, location: &str) -> Result<Dataset, String> {
    let fetcher = AnyFetcher {
        client: client.clone(),
    };
    let dataset = fetch_dataset(&fetcher, location)
        .await
        .map_err(|e| e.to_string())?;
    tracing::debug!(location, features = dataset.len(), "dataset loaded");
    Ok(dataset)
}

fn controller_for(
    mut config: MapConfig,
    view: &ViewArgs,
    dataset: Dataset,
) -> Result<MapController, String> {
    config.center_lon_lat = [view.center_lon, view.center_lat];
    config.initial_zoom = view.zoom;
    config.validate().map_err(|e| e.to_string())?;
    let mut controller = MapController::new(config, Viewport::new(view.width, view.height));
    controller.load_dataset(dataset).map_err(|e| e.to_string())?;
    Ok(controller)
}

async fn render<L: TaxonLookup>(
    controller: &MapController,
    lookup: L,
    images: CheckingImageLoader,
    request: RenderRequest,
) -> RenderedBatch {
    let renderer = CardRenderer::new(
        lookup,
        images,
        TokioTimer,
        controller.config().renderer_config(),
    );
    renderer.render_batch(request).await
}

fn summarize(dataset: &Dataset) -> DatasetSummary {
    let locations: BTreeSet<_> = dataset
        .features
        .iter()
        .map(|f| (f.lon_lat[0].to_bits(), f.lon_lat[1].to_bits()))
        .collect();
    let species: BTreeSet<&str> = dataset
        .features
        .iter()
        .map(|f| f.scientific_name.as_str())
        .filter(|s| !s.is_empty())
        .collect();
    let extent = dataset.extent();
    let bbox = (!extent.is_empty()).then(|| {
        let [min_lon, min_lat] = mercator_to_lon_lat(extent.min);
        let [max_lon, max_lat] = mercator_to_lon_lat(extent.max);
        [min_lon, min_lat, max_lon, max_lat]
    });
    DatasetSummary {
        features: dataset.len(),
        locations: locations.len(),
        species: species.len(),
        bbox,
    }
}

fn cluster_rows(controller: &mut MapController) -> Vec<ClusterRow> {
    controller
        .styled_clusters()
        .into_iter()
        .map(|s| ClusterRow {
            members: s.cluster.len(),
            lon_lat: mercator_to_lon_lat(s.cluster.anchor),
            pixel: s.pixel,
            location_label: s.style.kind == MarkerText::Location,
            label: s.style.text.text,
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let line = serde_json::to_string(value).map_err(|e| e.to_string())?;
    println!("{line}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> Dataset {
        let payload = include_str!("../../apps/web/assets/data/macaulaylibrary.geojson");
        Dataset::from_geojson_str(payload).unwrap()
    }

    fn view(zoom: f64, center: [f64; 2]) -> ViewArgs {
        ViewArgs {
            zoom,
            center_lon: center[0],
            center_lat: center[1],
            width: 1000.0,
            height: 800.0,
        }
    }

    #[test]
    fn summary_counts_sites_and_species() {
        let s = summarize(&demo());
        assert_eq!(s.features, 16);
        assert_eq!(s.locations, 5);
        assert_eq!(s.species, 16);
        let bbox = s.bbox.unwrap();
        assert!((bbox[0] - -122.4862).abs() < 1e-6);
        assert!((bbox[3] - 51.5072).abs() < 1e-6);
    }

    #[test]
    fn cluster_rows_label_lone_sites_at_max_zoom() {
        let mut c =
            controller_for(MapConfig::default(), &view(13.0, [-0.1276, 51.5072]), demo()).unwrap();
        let rows = cluster_rows(&mut c);
        let london = rows.iter().find(|r| r.location_label).unwrap();
        assert_eq!(london.label, "London, England");
        assert_eq!(london.members, 1);
    }

    #[test]
    fn world_view_groups_everything_into_few_clusters() {
        let mut c = controller_for(MapConfig::default(), &view(1.0, [0.0, 0.0]), demo()).unwrap();
        let rows = cluster_rows(&mut c);
        assert_eq!(rows.iter().map(|r| r.members).sum::<usize>(), 16);
        assert!(rows.iter().all(|r| !r.location_label));
    }

    #[test]
    fn invalid_view_is_rejected() {
        let config = MapConfig {
            min_zoom: 20.0,
            ..MapConfig::default()
        };
        assert!(controller_for(config, &view(1.0, [0.0, 0.0]), demo()).is_err());
    }

    #[tokio::test]
    async fn offline_click_prints_ten_cards() {
        let mut c =
            controller_for(MapConfig::default(), &view(6.0, [-76.4497, 42.4799]), demo()).unwrap();
        let pixel = cluster_rows(&mut c)
            .into_iter()
            .find(|r| r.members == 12)
            .unwrap()
            .pixel;
        let ClickOutcome::ShowResults { request, .. } = c.click(pixel) else {
            panic!("expected a results render");
        };
        let images = CheckingImageLoader {
            client: Client::new(),
            assets: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../apps/web/assets")),
        };
        let batch = render(&c, OfflineLookup, images, request).await;
        assert!(c.complete_render(batch));
        let html = c.panel().to_html();
        assert_eq!(html.matches("<audio controls>").count(), 10);
        assert!(html.contains("./img/default_bird.png"));
    }
}
