//! End-to-end scrape runs against an in-process fake of the map service.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use image::{ImageFormat, Rgba, RgbaImage};
use parking_lot::Mutex;
use tempfile::TempDir;

use floorscraper::config::ConfigFile;
use floorscraper::export::CSV_HEADER;
use floorscraper::grid::GridCoord;
use floorscraper::orchestrator::{FloorSelection, ScrapeSettings, Scraper};
use floorscraper::provider::{Endpoints, HttpClient, RetryPolicy, RetryingClient};
use floorscraper::storage::StorageLayout;
use floorscraper::{ScrapeError, ScrapeResult};

const MANIFEST: &str = r#"
    // floor table
    var floorData = new Array();
    floorData["G"] = { mapWidth: 400, mapHeight: 200, name: "Ground" };
    floorData["LG1"] = { mapWidth: "200", mapHeight: "0" };
"#;

/// Fake service keyed by exact URL, with optional transient failures.
struct FakeService {
    responses: HashMap<String, Vec<u8>>,
    failures: Mutex<HashMap<String, usize>>,
    requests: Mutex<Vec<String>>,
}

impl FakeService {
    fn new(endpoints: &Endpoints) -> Self {
        let mut responses = HashMap::new();
        responses.insert(endpoints.manifest_url().to_string(), MANIFEST.as_bytes().to_vec());
        for (floor, width, height) in [("G", 400, 200), ("LG1", 200, 0)] {
            for x in (0..=width).step_by(200) {
                for y in (0..=height).step_by(200) {
                    let coord = GridCoord::new(x, y);
                    responses.insert(endpoints.tile_url(coord, floor), tile_png(coord));
                    responses.insert(
                        endpoints.data_url(coord, floor, 200),
                        format!("{};{};{}-{};room;;;{}\n", x, y, floor, x, x + y).into_bytes(),
                    );
                }
            }
        }
        Self {
            responses,
            failures: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail the next `times` requests for `url`.
    fn fail(self, url: String, times: usize) -> Self {
        self.failures.lock().insert(url, times);
        self
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

impl HttpClient for FakeService {
    fn get(&self, url: &str) -> ScrapeResult<Vec<u8>> {
        self.requests.lock().push(url.to_string());
        if let Some(left) = self.failures.lock().get_mut(url) {
            if *left > 0 {
                *left -= 1;
                return Err(ScrapeError::network(url, "HTTP 503"));
            }
        }
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| ScrapeError::network(url, "HTTP 404"))
    }
}

fn color_for(coord: GridCoord) -> Rgba<u8> {
    Rgba([(coord.x / 2) as u8, (coord.y / 2) as u8, 200, 255])
}

fn tile_png(coord: GridCoord) -> Vec<u8> {
    let mut bytes = Vec::new();
    RgbaImage::from_pixel(200, 200, color_for(coord))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

#[test]
fn test_ground_floor_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let layout = StorageLayout::new(tmp.path().join("data"));
    let endpoints = Endpoints::default();
    let service = FakeService::new(&endpoints);
    let scraper = Scraper::new(&service, endpoints.clone(), layout.clone());

    let report = scraper.run(&FloorSelection::default()).unwrap();

    assert_eq!(report.floors.len(), 1);
    assert!(report.skipped.is_empty());

    // Manifest, then tile + data per cell, x outer and y inner
    let requests = service.requests();
    assert_eq!(requests.len(), 1 + 6 * 2);
    assert_eq!(requests[0], endpoints.manifest_url());
    assert_eq!(requests[1], endpoints.tile_url(GridCoord::new(0, 0), "G"));
    assert_eq!(requests[3], endpoints.tile_url(GridCoord::new(0, 200), "G"));
    assert_eq!(requests[5], endpoints.tile_url(GridCoord::new(200, 0), "G"));

    assert!(layout.manifest_path().is_file());
    for x in [0, 200, 400] {
        for y in [0, 200] {
            assert!(layout.tile_path("G", GridCoord::new(x, y)).is_file());
        }
    }

    let map = image::open(layout.composite_path("G")).unwrap().to_rgba8();
    assert_eq!(map.dimensions(), (600, 400));
    for x in [0, 200, 400] {
        for y in [0, 200] {
            let coord = GridCoord::new(x, y);
            assert_eq!(*map.get_pixel(x + 10, y + 10), color_for(coord));
        }
    }

    let table = std::fs::read_to_string(layout.table_path("G")).unwrap();
    let mut lines = table.lines();
    assert_eq!(lines.next(), Some(CSV_HEADER.trim_end()));
    assert_eq!(lines.next(), Some("0,0,G-0,room,,,0"));
    assert_eq!(lines.next(), Some("0,200,G-0,room,,,200"));
    assert_eq!(table.lines().count(), 7);
    assert!(!table.contains(';'));
}

#[test]
fn test_all_floors_in_identifier_order() {
    let tmp = TempDir::new().unwrap();
    let layout = StorageLayout::new(tmp.path());
    let endpoints = Endpoints::default();
    let service = FakeService::new(&endpoints);
    let scraper = Scraper::new(&service, endpoints, layout.clone());

    let report = scraper.run(&FloorSelection::All).unwrap();

    let floors: Vec<&str> = report.floors.iter().map(|f| f.floor_id.as_str()).collect();
    assert_eq!(floors, vec!["G", "LG1"]);
    assert_eq!(report.floors[1].tiles, 2);
    assert_eq!(report.floors[1].composite_size, (400, 200));
    assert_eq!(report.total_tiles(), 8);
    assert!(layout.composite_path("LG1").is_file());
    assert!(layout.table_path("LG1").is_file());
}

#[test]
fn test_parallel_run_matches_sequential_output() {
    let endpoints = Endpoints::default();
    let mut outputs = Vec::new();

    for parallel in [1, 4] {
        let tmp = TempDir::new().unwrap();
        let layout = StorageLayout::new(tmp.path());
        let service = FakeService::new(&endpoints);
        let scraper = Scraper::new(&service, endpoints.clone(), layout.clone()).with_settings(
            ScrapeSettings {
                parallel,
                ..ScrapeSettings::default()
            },
        );
        scraper.run(&FloorSelection::default()).unwrap();

        outputs.push((
            std::fs::read_to_string(layout.table_path("G")).unwrap(),
            image::open(layout.composite_path("G")).unwrap().to_rgba8(),
        ));
    }

    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn test_failing_cell_leaves_no_floor_outputs() {
    let tmp = TempDir::new().unwrap();
    let layout = StorageLayout::new(tmp.path());
    let endpoints = Endpoints::default();
    let failing = endpoints.data_url(GridCoord::new(200, 200), "G", 200);
    let service = FakeService::new(&endpoints).fail(failing.clone(), usize::MAX);
    let scraper = Scraper::new(&service, endpoints, layout.clone());

    let err = scraper.run(&FloorSelection::default()).unwrap_err();

    match err {
        ScrapeError::Network { url, .. } => assert_eq!(url, failing),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(service.requests().last(), Some(&failing));
    assert!(!layout.composite_path("G").exists());
    assert!(!layout.table_path("G").exists());
}

#[test]
fn test_retry_recovers_transient_failure() {
    let tmp = TempDir::new().unwrap();
    let layout = StorageLayout::new(tmp.path());
    let endpoints = Endpoints::default();
    let flaky = endpoints.tile_url(GridCoord::new(400, 0), "G");
    let service = FakeService::new(&endpoints).fail(flaky.clone(), 2);
    let client = RetryingClient::new(
        &service,
        RetryPolicy::new(2, std::time::Duration::from_millis(1)),
    );
    let scraper = Scraper::new(client, endpoints, layout.clone());

    let report = scraper.run(&FloorSelection::default()).unwrap();

    assert_eq!(report.floors[0].tiles, 6);
    assert_eq!(service.requests().iter().filter(|u| **u == flaky).count(), 3);
    assert!(layout.composite_path("G").is_file());
}

#[test]
fn test_unknown_floor_is_skipped() {
    let tmp = TempDir::new().unwrap();
    let layout = StorageLayout::new(tmp.path());
    let endpoints = Endpoints::default();
    let service = FakeService::new(&endpoints);
    let scraper = Scraper::new(&service, endpoints, layout.clone());

    let report = scraper
        .run(&"3F".parse::<FloorSelection>().unwrap())
        .unwrap();

    assert!(report.floors.is_empty());
    assert_eq!(report.skipped, vec!["3F".to_string()]);
    // Only the manifest was requested
    assert_eq!(service.requests().len(), 1);
}

#[test]
fn test_bootstrap_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let layout = StorageLayout::new(tmp.path());
    let endpoints = Endpoints::default();
    let service = FakeService::new(&endpoints);
    let scraper = Scraper::new(&service, endpoints, layout.clone());

    scraper.run(&FloorSelection::default()).unwrap();
    let first = std::fs::read(layout.table_path("G")).unwrap();
    scraper.run(&FloorSelection::default()).unwrap();

    assert_eq!(std::fs::read(layout.table_path("G")).unwrap(), first);
}

#[test]
fn test_config_file_drives_run_settings() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.ini");
    std::fs::write(
        &path,
        format!(
            "[paths]\nroot_dir = {}\n[scrape]\nfloors = LG1\nparallel = 2\n",
            tmp.path().join("out").display()
        ),
    )
    .unwrap();

    let config = ConfigFile::load_from(&path)
        .unwrap()
        .to_scrape_config()
        .unwrap();
    let service = FakeService::new(&config.endpoints);
    let scraper = Scraper::new(&service, config.endpoints.clone(), config.layout.clone())
        .with_settings(config.settings);

    let report = scraper.run(&config.selection).unwrap();

    assert_eq!(report.floors[0].floor_id, "LG1");
    assert!(tmp.path().join("out/images/LG1.png").is_file());
}

#[test]
fn test_progress_callback_sees_every_cell() {
    let tmp = TempDir::new().unwrap();
    let endpoints = Endpoints::default();
    let service = FakeService::new(&endpoints);
    let count = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&count);
    let scraper = Scraper::new(&service, endpoints, StorageLayout::new(tmp.path()))
        .with_progress(Arc::new(move |_, _, _| *sink.lock() += 1));

    scraper.run(&FloorSelection::All).unwrap();

    assert_eq!(*count.lock(), 8);
}
