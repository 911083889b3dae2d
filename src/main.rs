use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::signal;
use tokio::signal::unix::{signal as unix_signal, SignalKind};
use tracing::{error, info, warn};

use gridtouch::config::Config;
use gridtouch::interaction::{DemoShell, TileView, WorkspaceView};
use gridtouch::provider::{create_providers, CaptureArbiter, ProviderChain};
use gridtouch::utils::{self, DeviceFinder};

#[derive(Parser, Debug)]
#[command(name = "gridtouch")]
#[command(about = "Жесты тачпада и упругая сетка рабочих областей для тайлового оконного менеджера")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "gridtouch.toml")]
    config: String,

    /// Уровень логирования (по умолчанию из конфигурации)
    #[arg(long)]
    log_level: Option<String>,

    /// Показать найденные сенсорные устройства и выйти
    #[arg(long)]
    list_devices: bool,

    /// Размер демонстрационной сетки рабочих областей
    #[arg(long, default_value_t = 3)]
    extent: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Загрузка конфигурации
    let config = Arc::new(Config::load(&args.config)?);

    // Инициализация системы логирования
    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(level, &config.logging.format)?;

    info!("Запуск gridtouch v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    // Проверка прав доступа
    if let Err(e) = utils::check_permissions() {
        error!("{}", e);
        for line in utils::get_setup_commands() {
            info!("{}", line);
        }
        return Err(e.into());
    }

    if args.list_devices {
        DeviceFinder::log_touch_devices(&config.devices.device_path)?;
        return Ok(());
    }

    let extent = args.extent.max(1) as f64;
    let shell = DemoShell::new(
        Arc::clone(&config),
        WorkspaceView {
            i: 0.0,
            j: 0.0,
            size: 1.0,
            min_i: 0.0,
            min_j: 0.0,
            max_i: extent - 1.0,
            max_j: extent - 1.0,
        },
        TileView {
            i: 0.0,
            j: 0.0,
            w: 1.0,
            h: 1.0,
        },
        Handle::current(),
    );
    let arbiter = CaptureArbiter::new(shell.clone());
    let providers = ProviderChain::new(create_providers(Arc::clone(&config), arbiter));

    info!("Все компоненты инициализированы");

    providers.start().await?;

    info!("Все провайдеры запущены");

    // Клавиатуры нет: модификатор переключается сигналом SIGUSR1
    let mut modifier_signal = unix_signal(SignalKind::user_defined1())?;
    let mut modifier_held = false;
    info!("Модификатор переключается командой: kill -USR1 {}", std::process::id());

    // Ожидание сигнала завершения
    loop {
        tokio::select! {
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
                    Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
                }
                break;
            }
            _ = modifier_signal.recv() => {
                modifier_held = !modifier_held;
                info!("Модификатор {}", if modifier_held { "зажат" } else { "отпущен" });
                shell.set_modifier(modifier_held);
                providers.on_modifiers(modifier_held);
            }
        }
    }

    info!("Завершение работы...");

    // Ожидаем остановки провайдеров (с таймаутом)
    let shutdown_timeout = tokio::time::Duration::from_secs(5);
    match tokio::time::timeout(shutdown_timeout, providers.stop()).await {
        Ok(()) => info!("Все провайдеры завершили работу корректно"),
        Err(_) => warn!("Таймаут при завершении провайдеров"),
    }

    let view = shell.workspace();
    info!(
        "Итоговая рабочая область: ({}, {}), размер {}",
        view.i, view.j, view.size
    );
    let tile = shell.tile();
    info!(
        "Итоговое окно: ({}, {}) {}x{}",
        tile.i, tile.j, tile.w, tile.h
    );
    info!("gridtouch завершил работу");
    Ok(())
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let registry = tracing_subscriber::registry().with(filter);
    if format == "full" {
        registry.with(tracing_subscriber::fmt::layer()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().compact()).init();
    }

    Ok(())
}
