mod app;
mod config;
mod library;
mod model;
mod storage;
mod sync;
mod transfer;

use app::*;
use config::ExtensionEnv;
use leptos::mount::mount_to_body;
use leptos::prelude::*;

fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());

    let env = ExtensionEnv::detect();
    log::info!("Starting sheets popup on {}", env.vendor);
    log::debug!("User agent: {}", env.user_agent);
    mount_to_body(move || {
        view! {
            <App env=env />
        }
    })
}
