use std::{
  path::{Path, PathBuf},
  sync::{Arc, mpsc},
};

use civicmap::{
  CivicMap, MapMount,
  config::Config,
  dataset::FeatureCollection,
  map::layers::{
    LayerProvider, OverlayDatasets,
    traffic::{SimulatedTrafficFeed, readings_from_dataset},
    weather::{SimulatedWeatherFeed, WeatherSnapshot},
  },
  record_source::{FileRecordSource, HttpRecordSource, LoadedRecords, load_records},
  search::GeocoderClient,
};
use clap::Parser as _;
use log::{error, info};

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// Complaints as a JSON array. Fetched from the API if not given.
  #[arg(long)]
  complaints: Option<PathBuf>,

  /// Projects as a JSON array. Fetched from the API if not given.
  #[arg(long)]
  projects: Option<PathBuf>,

  /// Ward boundaries as a GeoJSON feature collection.
  #[arg(long)]
  boundaries: Option<PathBuf>,

  /// Population density polygons as GeoJSON.
  #[arg(long)]
  population: Option<PathBuf>,

  /// Road, water, power and sewer networks as GeoJSON.
  #[arg(long)]
  infrastructure: Option<PathBuf>,

  /// Past complaints as GeoJSON points. The loaded complaints are used otherwise.
  #[arg(long)]
  historical: Option<PathBuf>,

  /// Road segments as GeoJSON lines with a `congestion` property between 0 and 1.
  #[arg(long)]
  traffic: Option<PathBuf>,

  /// Current weather as a JSON object with `temperature_c`, `condition`, `humidity_pct` and
  /// `wind_kmh`.
  #[arg(long)]
  weather: Option<PathBuf>,

  /// Adds simulated weather and traffic feeds for overlays without data.
  #[arg(long, default_value_t = false)]
  simulate: bool,
}

fn read_dataset(path: Option<&Path>) -> Option<FeatureCollection> {
  let path = path?;
  FeatureCollection::from_file(path)
    .inspect_err(|e| error!("Could not load dataset {}: {e}", path.display()))
    .ok()
}

fn read_weather(path: Option<&Path>) -> Option<WeatherSnapshot> {
  let path = path?;
  let data = std::fs::read_to_string(path)
    .inspect_err(|e| error!("Could not read {}: {e}", path.display()))
    .ok()?;
  serde_json::from_str(&data)
    .inspect_err(|e| error!("Invalid weather snapshot {}: {e}", path.display()))
    .ok()
}

fn layer_provider(args: &Args) -> LayerProvider {
  let datasets = OverlayDatasets {
    boundaries: read_dataset(args.boundaries.as_deref()),
    population: read_dataset(args.population.as_deref()),
    infrastructure: read_dataset(args.infrastructure.as_deref()),
    historical: read_dataset(args.historical.as_deref()),
    weather: read_weather(args.weather.as_deref()),
    traffic: read_dataset(args.traffic.as_deref()).map(|roads| readings_from_dataset(&roads)),
  };
  let roads = datasets
    .infrastructure
    .as_ref()
    .map(SimulatedTrafficFeed::from_infrastructure);
  let mut provider = LayerProvider::new(datasets);
  if args.simulate {
    provider = provider.with_weather_feed(SimulatedWeatherFeed::default());
    if let Some(roads) = roads {
      provider = provider.with_traffic_feed(roads);
    }
  }
  provider
}

struct CivicApp {
  config: Config,
  layers: Option<LayerProvider>,
  records: mpsc::Receiver<LoadedRecords>,
  mount: MapMount,
}

impl eframe::App for CivicApp {
  // Drawing happens in `update`; eframe calls it right before `ui` every frame.
  fn ui(&mut self, _ui: &mut egui::Ui, _frame: &mut eframe::Frame) {}

  fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
    let config = &self.config;
    if self.mount.map().is_none() {
      // The map is built once the records are in.
      let Ok(loaded) = self.records.try_recv() else {
        egui::CentralPanel::default().show(ctx, MapMount::placeholder);
        return;
      };
      let layers = &mut self.layers;
      let map = self.mount.get_or_mount(ctx, |_| {
        let geocoder = GeocoderClient::from_config(&config.geocoder(), config.api_base_url());
        info!("Geocoding through {}", geocoder.geocoder_name());
        CivicMap::new(config, layers.take().unwrap_or_default()).with_geocoder(geocoder)
      });
      map.set_records(loaded);
    }
    let Some(map) = self.mount.map_mut() else {
      return;
    };
    map.show(ctx);
    for intent in map.take_navigation() {
      let url = format!("{}{}", config.api_base_url(), intent.path());
      if let Err(e) = open::that(&url) {
        error!("Could not open {url}: {e}");
      }
    }
  }
}

fn main() -> eframe::Result {
  let args = Args::parse();

  // init logger.
  env_logger::init();

  // start tokio on another thread.
  let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
  let handle = rt.handle().clone();
  let spawner = handle.clone();
  let _enter = handle.enter();
  std::thread::spawn(move || {
    rt.block_on(async {
      loop {
        tokio::time::sleep(tokio::time::Duration::from_secs(3600)).await;
      }
    });
  });

  let config = Config::new();
  info!("Using API at {}", config.api_base_url());
  let layers = layer_provider(&args);
  let source = FileRecordSource::new(args.complaints, args.projects)
    .with_fallback(Arc::new(HttpRecordSource::new(config.api_base_url())));

  let options = eframe::NativeOptions {
    viewport: egui::ViewportBuilder {
      inner_size: Some(egui::vec2(1600.0, 1000.0)),
      clamp_size_to_monitor_size: Some(true),
      ..Default::default()
    },
    ..Default::default()
  };

  eframe::run_native(
    "civicmap",
    options,
    Box::new(move |cc| {
      // Image support for record photos.
      egui_extras::install_image_loaders(&cc.egui_ctx);

      let (tx, rx) = mpsc::channel();
      let ctx = cc.egui_ctx.clone();
      spawner.spawn(async move {
        let loaded = load_records(&source).await;
        if tx.send(loaded).is_ok() {
          ctx.request_repaint();
        }
      });

      Ok(Box::new(CivicApp {
        config,
        layers: Some(layers),
        records: rx,
        mount: MapMount::default(),
      }))
    }),
  )
}
