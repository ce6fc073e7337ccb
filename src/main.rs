use std::{fs, path::PathBuf};

use anyhow::Context;
use arboard::Clipboard;
use clap::Parser;
use url::Url;
use visual_search::{
    SearchClient,
    analytics::AnalyticsSink,
    config::{ClientConfig, ThemeSource},
    drawer::{DrawerController, Toast},
    geometry::{CropRegion, ImageMetrics, PixelRect},
    image_processor,
    upload::UploadSource,
};

#[derive(Parser, Debug)]
#[command(version, about = "Search a store's catalogue by image", long_about = None)]
struct Args {
    /// Path or http(s) URL of the image
    image: String,

    /// Detection API endpoint
    #[arg(long, env = "VISUAL_SEARCH_API_URL")]
    api_url: String,

    /// Shop domain sent with every request
    #[arg(long, env = "VISUAL_SEARCH_SHOP")]
    shop: String,

    /// Admin app origin that receives analytics beacons
    #[arg(long, env = "VISUAL_SEARCH_ADMIN_URL")]
    admin_url: Option<String>,

    /// Search a normalized region instead: x,y,width,height in 0..1
    #[arg(long, value_parser = parse_region)]
    crop: Option<CropRegion>,

    /// Search the region of a detection returned for the full image
    #[arg(long)]
    detection: Option<String>,

    /// Number of result pages to show
    #[arg(long, default_value_t = 1)]
    pages: usize,

    /// Write the result cards as JSON to this file
    #[arg(long)]
    json: Option<PathBuf>,

    /// Copy the product URLs to the clipboard
    #[arg(long)]
    clip: bool,
}

fn parse_region(s: &str) -> Result<CropRegion, String> {
    let parts: Vec<f32> = s
        .split(',')
        .map(|p| p.trim().parse::<f32>().map_err(|e| e.to_string()))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        [x, y, width, height] => Ok(CropRegion {
            x: *x,
            y: *y,
            width: *width,
            height: *height,
        }
        .clamped()),
        _ => Err("expected x,y,width,height".to_string()),
    }
}

fn upload_source(input: &str) -> UploadSource {
    match Url::parse(input) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => UploadSource::Url(url),
        _ => UploadSource::Path(PathBuf::from(input)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    let mut config = ClientConfig::new(&args.api_url, &args.shop)?;
    if let Some(admin) = args.admin_url.as_deref() {
        config = config.with_admin_origin(admin)?;
    }

    let client = SearchClient::new(config.clone())?;
    let http = client.http().clone();
    let theme_source = ThemeSource {
        injected_json: std::env::var("VISUAL_SEARCH_CONFIG").ok(),
        ..Default::default()
    };

    let mut drawer = DrawerController::new(client, &theme_source)
        .with_analytics(AnalyticsSink::new(http.clone(), &config))
        .with_http(http)
        .with_page_url(args.image.clone());

    let outcome = run(&mut drawer, &args).await;
    for toast in drawer.take_toasts() {
        match toast {
            Toast::Error(msg) => eprintln!("Error: {}", msg),
            Toast::Info(msg) => eprintln!("{}", msg),
        }
    }
    outcome?;

    let view = drawer.view();
    println!("{}", view.header);
    if let Some(overlay) = &view.overlay {
        for marker in &overlay.markers {
            let label = drawer
                .session()
                .detection(&marker.box_id)
                .and_then(|d| d.label.clone())
                .unwrap_or_default();
            let flag = if marker.selected { "*" } else { " " };
            println!("{} detection {} {}", flag, marker.box_id, label);
        }
    }
    for card in &view.cards {
        println!("{}\t{}\t{}", card.title, card.price, card.url);
    }

    if let Some(path) = &args.json {
        fs::write(path, serde_json::to_string_pretty(&view.cards)?)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    if args.clip {
        let urls = view
            .cards
            .iter()
            .map(|c| c.url.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        match Clipboard::new() {
            Ok(mut clipboard) => {
                if let Err(e) = clipboard.set_text(urls) {
                    eprintln!("Failed to copy to clipboard: {}", e);
                }
            }
            Err(e) => eprintln!("Failed to initialize clipboard: {}", e),
        }
    }

    drawer.dispose();
    Ok(())
}

async fn run(drawer: &mut DrawerController<SearchClient>, args: &Args) -> anyhow::Result<()> {
    drawer.upload(upload_source(&args.image)).await?;

    // Without a browser layout the preview is shown at natural size.
    if let Some((w, h)) = drawer
        .session()
        .upload()
        .and_then(|u| image_processor::probe_dimensions(&u.bytes))
    {
        let rect = PixelRect::new(0.0, 0.0, w as f32, h as f32);
        drawer.set_image_metrics(&ImageMetrics {
            natural_width: w,
            natural_height: h,
            element: rect,
            container: rect,
        })?;
    }

    if let Some(box_id) = args.detection.as_deref() {
        drawer.select_detection(box_id).await?;
    } else if let Some(region) = args.crop {
        drawer.search_region(region).await?;
    }

    for _ in 1..args.pages {
        if !drawer.session().results().has_more() {
            break;
        }
        drawer.load_more().await?;
    }
    Ok(())
}
