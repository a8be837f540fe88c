use std::io::Cursor;
use std::net::{IpAddr, Ipv4Addr};

use axum::Router;
use base64::Engine;
use image::{ImageFormat, Rgba, RgbaImage};
use tokio::sync::broadcast;

use sleep_screen_backend::config::{
    Config, MonitorConfig, RemoteLandmarksConfig, ScreeningConfig,
};
use sleep_screen_backend::routes::build_router;
use sleep_screen_backend::screening::ModelKind;
use sleep_screen_backend::state::AppState;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
}

/// 直接构造 Config，避免 set_var 在多线程测试中产生竞态
pub fn test_config() -> Config {
    Config {
        host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        cors_origin: "http://localhost:5173".to_string(),
        max_image_bytes: 256 * 1024,
        screening: ScreeningConfig {
            default_model: ModelKind::Enhanced,
            display_accuracy_pin: Some(90),
        },
        remote_landmarks: RemoteLandmarksConfig {
            enabled: false,
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: String::new(),
            timeout_secs: 1,
        },
        monitor: MonitorConfig {
            tick_ms: 20,
            stream_interval_ms: 20,
            auto_start: false,
            max_streams: 4,
        },
    }
}

pub fn spawn_with_config(config: Config) -> TestApp {
    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = AppState::new(&config, shutdown_tx);
    let app = build_router(state.clone());

    TestApp { app, state, config }
}

pub async fn spawn_test_server() -> TestApp {
    spawn_with_config(test_config())
}

/// 生成一张确定性的 PNG，返回 base64（不带 data URL 前缀）
pub fn png_base64(width: u32, height: u32, shade: u8) -> String {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            shade.wrapping_add((x * 3) as u8),
            shade.wrapping_add((y * 5) as u8),
            shade ^ ((x + y) as u8),
            255,
        ])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).expect("encode png");
    base64::engine::general_purpose::STANDARD.encode(buf.into_inner())
}

pub fn png_data_url(width: u32, height: u32, shade: u8) -> String {
    format!("data:image/png;base64,{}", png_base64(width, height, shade))
}
