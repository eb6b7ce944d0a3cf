//! WebWindow demo
//!
//! Drives the headless backend end to end: a page served from a custom
//! scheme, messages in both directions, and worker threads invoking work on
//! the UI thread before the root window closes.

use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use webwindow::platform::headless::{HeadlessEngine, HeadlessWindows, ResourceLoad};
use webwindow::{Config, NAME, SchemeResponse, Severity, Ui, VERSION};

const INDEX_HTML: &str = "<!doctype html><h1>Hello from app://</h1>";

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config = match args.iter().position(|arg| arg == "--config") {
        Some(i) => match args.get(i + 1).map(Config::load) {
            Some(Ok(config)) => config,
            Some(Err(e)) => {
                eprintln!("Failed to load configuration: {}", e);
                std::process::exit(1);
            }
            None => {
                eprintln!("--config needs a path");
                std::process::exit(2);
            }
        },
        None => Config::default(),
    };

    if let Err(e) = run(config) {
        eprintln!("{} failed: {}", NAME, e);
        std::process::exit(1);
    }
}

fn run(config: Config) -> webwindow::Result<()> {
    println!("{} v{}", NAME, VERSION);

    let engine = HeadlessEngine::new();
    let pages = engine.pages();
    let mut ui = Ui::with_settings(HeadlessWindows::new(), engine, config.engine);

    let window = ui.create_window(&config.window, None, |message| {
        println!("page -> host: {}", message);
    })?;
    ui.add_custom_scheme(window, "app", |uri| {
        log::info!("serving {}", uri);
        Some(SchemeResponse::new(INDEX_HTML, "text/html"))
    })?;
    ui.show(window)?;
    ui.navigate(window, "app://index.html")?;

    if let Some(page) = pages.page(window) {
        if let ResourceLoad::Synthetic(response) = page.request("app://index.html") {
            println!(
                "app://index.html -> {} {} ({} bytes of {})",
                response.status(),
                response.reason(),
                response.body().len(),
                response.content_type().unwrap_or("?")
            );
        }
        page.post_to_host("ready");
    }
    ui.send_message(window, "welcome")?;

    let proxy = ui.proxy();
    let invoked = Arc::new(AtomicUsize::new(0));
    let workers: Vec<_> = (0..4)
        .map(|id| {
            let proxy = proxy.clone();
            let invoked = Arc::clone(&invoked);
            thread::spawn(move || {
                proxy.invoke(window, move |ui| {
                    invoked.fetch_add(1, Ordering::SeqCst);
                    let title = format!("worker {} was here", id);
                    if let Err(e) = ui.set_title(window, &title) {
                        log::warn!("set_title failed: {}", e);
                    }
                })
            })
        })
        .collect();

    let closer = thread::spawn(move || {
        for worker in workers {
            if let Ok(Err(e)) = worker.join() {
                log::warn!("invoke failed: {}", e);
            }
        }
        let _ = proxy.show_message(window, NAME, "Closing", Severity::Info);
        let _ = proxy.close(window);
    });

    ui.run(window)?;
    let _ = closer.join();

    println!("{} invocations ran on the UI thread", invoked.load(Ordering::SeqCst));
    Ok(())
}
