use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info};

use super::move_resize::{MoveSession, ResizeSession, TileOutcome, TileView};
use super::swipe::{SwipeSession, WorkspaceView};
use super::zoom::ZoomSession;
use crate::config::{Config, LowpassConfig};
use crate::events::{GestureKind, GestureValues};
use crate::gestures::{Gesture, GesturePhase, LowpassGesture};
use crate::provider::GestureHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    Swipe,
    Zoom,
    MoveTile,
    ResizeTile,
}

/// Оболочка без композитора: принимает жесты по привязкам, ведёт сессии
/// свайпа, масштабирования, перемещения и изменения размера окна
/// и хранит их итог.
pub struct DemoShell {
    config: Arc<Config>,
    runtime: Handle,
    workspace: Arc<Mutex<WorkspaceView>>,
    tile: Arc<Mutex<TileView>>,
    modifier: AtomicBool,
    busy: Arc<AtomicBool>,
}

impl DemoShell {
    /// Сессии запускаются на `runtime`, поэтому жест можно предложить из любого потока
    pub fn new(
        config: Arc<Config>,
        workspace: WorkspaceView,
        tile: TileView,
        runtime: Handle,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            runtime,
            workspace: Arc::new(Mutex::new(workspace)),
            tile: Arc::new(Mutex::new(tile)),
            modifier: AtomicBool::new(false),
            busy: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn workspace(&self) -> WorkspaceView {
        *self.workspace.lock()
    }

    pub fn tile(&self) -> TileView {
        *self.tile.lock()
    }

    /// Зажат ли модификатор; от него зависят привязки окна
    pub fn set_modifier(&self, held: bool) {
        if self.modifier.swap(held, Ordering::SeqCst) != held {
            debug!("Модификатор {}", if held { "зажат" } else { "отпущен" });
        }
    }

    pub fn modifier_held(&self) -> bool {
        self.modifier.load(Ordering::SeqCst)
    }

    fn binding(&self, kind: GestureKind) -> Option<Binding> {
        let bindings = &self.config.interaction.bindings;
        // С модификатором привязки окна важнее привязок рабочей области
        if self.modifier_held() {
            if bindings.move_tile_kind() == Some(kind) {
                return Some(Binding::MoveTile);
            }
            if bindings.resize_tile_kind() == Some(kind) {
                return Some(Binding::ResizeTile);
            }
        }

        if bindings.swipe_kind() == Some(kind) {
            Some(Binding::Swipe)
        } else if bindings.zoom_kind() == Some(kind) {
            Some(Binding::Zoom)
        } else {
            None
        }
    }

    /// Вид жеста, на который оболочка сейчас откликается
    pub fn accepts(&self, kind: GestureKind) -> bool {
        self.binding(kind).is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Сглаживает жест и передаёт значения в `update`, пока жест не завершится
    async fn follow(gesture: Gesture, lowpass: LowpassConfig, mut update: impl FnMut(&GestureValues)) {
        let lowpass = LowpassGesture::spawn(gesture, lowpass);
        let mut filtered = lowpass.gesture();

        while let Some(state) = filtered.changed().await {
            if let Some(values) = state.values {
                update(&values);
            }
            if state.phase == GesturePhase::Terminated {
                break;
            }
        }
        lowpass.join().await;
    }

    async fn run_swipe(gesture: Gesture, config: Arc<Config>, workspace: Arc<Mutex<WorkspaceView>>) {
        let view = *workspace.lock();
        let mut session = SwipeSession::new(view, &config);

        Self::follow(gesture, config.lowpass, |values| {
            let frame = session.update(values);
            debug!("Свайп: i={:.3} j={:.3}", frame.i, frame.j);
        })
        .await;

        let outcome = session.finish();
        info!(
            "Свайп завершён: ({}, {}) за {:?}",
            outcome.i, outcome.j, outcome.duration
        );
        let mut view = workspace.lock();
        view.i = outcome.i as f64;
        view.j = outcome.j as f64;
    }

    async fn run_zoom(gesture: Gesture, config: Arc<Config>, workspace: Arc<Mutex<WorkspaceView>>) {
        let size = workspace.lock().size;
        let mut session = ZoomSession::new(size, 1, &config);

        Self::follow(gesture, config.lowpass, |values| {
            let frame = session.update(values);
            debug!("Масштаб: {:.3} (от {})", frame.size, frame.size_origin);
        })
        .await;

        let throw = session.finish();
        info!("Масштабирование завершено: размер {}", throw);
        workspace.lock().size = throw.target as f64;
    }

    async fn run_move(gesture: Gesture, config: Arc<Config>, tile: Arc<Mutex<TileView>>) {
        let view = *tile.lock();
        let mut session = MoveSession::new(view, &config);

        Self::follow(gesture, config.lowpass, |values| {
            let frame = session.update(values);
            debug!("Окно: i={:.3} j={:.3}", frame.view.i, frame.view.j);
        })
        .await;

        let outcome = session.finish();
        info!(
            "Окно перемещено: ({}, {}) за {:?}",
            outcome.i, outcome.j, outcome.duration
        );
        Self::place(&tile, outcome);
    }

    async fn run_resize(gesture: Gesture, config: Arc<Config>, tile: Arc<Mutex<TileView>>) {
        let view = *tile.lock();
        let mut session = ResizeSession::new(view, &config);

        Self::follow(gesture, config.lowpass, |values| {
            let frame = session.update(values);
            debug!(
                "Окно: {:.3}x{:.3} (от {:?})",
                frame.view.w, frame.view.h, frame.scale_origin
            );
        })
        .await;

        let outcome = session.finish();
        info!(
            "Размер окна изменён: ({}, {}) {}x{} за {:?}",
            outcome.i, outcome.j, outcome.w, outcome.h, outcome.duration
        );
        Self::place(&tile, outcome);
    }

    fn place(tile: &Mutex<TileView>, outcome: TileOutcome) {
        *tile.lock() = TileView {
            i: outcome.i as f64,
            j: outcome.j as f64,
            w: outcome.w as f64,
            h: outcome.h as f64,
        };
    }
}

impl GestureHandler for DemoShell {
    fn on_gesture(&self, gesture: Gesture) -> bool {
        let kind = gesture.kind();
        let Some(binding) = self.binding(kind) else {
            debug!("Жест {} не привязан", kind);
            return false;
        };
        if self.busy.swap(true, Ordering::SeqCst) {
            debug!("Сессия уже идёт, жест {} отклонён", kind);
            return false;
        }

        info!("Начата сессия {:?} ({})", binding, kind);
        let (config, workspace, tile, busy) = (
            Arc::clone(&self.config),
            Arc::clone(&self.workspace),
            Arc::clone(&self.tile),
            Arc::clone(&self.busy),
        );
        self.runtime.spawn(async move {
            match binding {
                Binding::Swipe => Self::run_swipe(gesture, config, workspace).await,
                Binding::Zoom => Self::run_zoom(gesture, config, workspace).await,
                Binding::MoveTile => Self::run_move(gesture, config, tile).await,
                Binding::ResizeTile => Self::run_resize(gesture, config, tile).await,
            }
            busy.store(false, Ordering::SeqCst);
        });
        true
    }
}
