mod capture;
mod pointer;
mod touchpad;
mod r#trait;

pub use self::capture::{CaptureArbiter, GestureHandler};
pub use self::pointer::{PointerGestureProvider, POINTER_OWNER};
pub use self::r#trait::{create_providers, AxisOrientation, GestureProvider};
pub use self::touchpad::TouchpadGestureProvider;

use crate::error::Result;
use crate::events::Handled;
use std::sync::Arc;
use tracing::info;

/// Цепочка провайдеров: сырое событие передаётся по порядку,
/// пока кто-нибудь его не обработает.
pub struct ProviderChain {
    providers: Vec<Arc<dyn GestureProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn GestureProvider>>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[Arc<dyn GestureProvider>] {
        &self.providers
    }

    fn dispatch(&self, call: impl Fn(&dyn GestureProvider) -> Handled) -> Handled {
        self.providers
            .iter()
            .map(|p| call(p.as_ref()))
            .find(Handled::is_handled)
            .unwrap_or(Handled::NotHandled)
    }

    pub fn on_native_gesture(&self, kind: &str, time_msec: u32, args: &[f64]) -> Handled {
        self.dispatch(|p| p.on_native_gesture(kind, time_msec, args))
    }

    pub fn on_motion(&self, time_msec: u32, delta_x: f64, delta_y: f64) -> Handled {
        self.dispatch(|p| p.on_motion(time_msec, delta_x, delta_y))
    }

    pub fn on_axis(
        &self,
        time_msec: u32,
        orientation: AxisOrientation,
        delta: f64,
        delta_discrete: i32,
    ) -> Handled {
        self.dispatch(|p| p.on_axis(time_msec, orientation, delta, delta_discrete))
    }

    pub fn reset(&self) {
        for provider in &self.providers {
            provider.reset();
        }
    }

    /// Состояние модификатора получают все провайдеры, а не первый откликнувшийся
    pub fn on_modifiers(&self, held: bool) {
        for provider in &self.providers {
            provider.on_modifiers(held);
        }
    }

    pub async fn start(&self) -> Result<()> {
        for provider in &self.providers {
            info!("Запуск провайдера {}", provider.name());
            provider.start().await?;
        }
        Ok(())
    }

    /// Остановка в обратном порядке
    pub async fn stop(&self) {
        for provider in self.providers.iter().rev() {
            provider.stop().await;
        }
    }
}
