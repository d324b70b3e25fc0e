use tower_http::trace::TraceLayer;
use zoomcrop::cors::build_cors_layer;
use zoomcrop::openapi::OPENAPI_JSON_PATH;
use zoomcrop::state::AppState;
use zoomcrop::{AppConfig, ShutdownManager, build_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zoomcrop=info,tower_http=info".into()),
        )
        .init();

    // 创建优雅退出管理器
    let shutdown_manager = ShutdownManager::new();

    // Load config
    let config = match AppConfig::init_global() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Config init failed: {}", e);
            std::process::exit(1);
        }
    };

    // 启动信号处理器
    if let Err(e) = shutdown_manager.start_signal_handler() {
        tracing::error!("信号处理器启动失败: {}", e);
        std::process::exit(1);
    }

    let app_state = match AppState::from_config(config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("应用状态初始化失败: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(
        backend = app_state.zoom.backend_name(),
        parallelism = config.transform.effective_parallelism(),
        jpeg_quality = config.transform.jpeg_quality,
        max_zoom = config.transform.max_zoom,
        "图像后端已就绪"
    );

    let mut app = build_router(app_state.clone());
    if let Some(cors) = build_cors_layer(&config.cors) {
        tracing::info!("CORS 已启用");
        app = app.layer(cors);
    }
    app = app.layer(TraceLayer::new_for_http());

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Docs: http://{}{}", addr, OPENAPI_JSON_PATH);
    tracing::info!("Health: http://{}/health", addr);

    // 运行服务器直到收到退出信号
    let graceful = axum::serve(listener, app).with_graceful_shutdown(
        shutdown_manager.drain_signal(config.shutdown.timeout_duration()),
    );

    if let Err(e) = graceful.await {
        tracing::error!("服务器运行错误: {}", e);
        std::process::exit(1);
    }

    let backend = app_state.zoom.backend_name();
    drop(app_state);
    tracing::info!("图像后端 {} 已释放，服务器已优雅关闭", backend);
}
