//! Tabsleep — tab lifecycle core of a browser tab suspender.
//!
//! Entry point: runs the core against a simulated browser and prints what it
//! does, step by step. Set `RUST_LOG=tabsleep=debug` for the full trace.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use tabsleep::app::App;
use tabsleep::context::Clock;
use tabsleep::database::Database;
use tabsleep::host::{BrowserHost, PageState, SimulatedBrowser};
use tabsleep::router::EventRouter;
use tabsleep::services::config::CoreConfig;
use tabsleep::types::event::BrowserEvent;
use tabsleep::types::message::{InstallReason, MessageSender};

const MINUTE_MS: i64 = 60_000;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tabsleep=info")),
        )
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Tabsleep v{} — Demo Mode                   ║", env!("CARGO_PKG_VERSION"));
    println!("║     Suspends idle tabs, restores them on demand             ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let config = match CoreConfig::load(CoreConfig::default_path()) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable config file");
            CoreConfig::default()
        }
    };
    let browser = Arc::new(SimulatedBrowser::new(&config.extension_base_url));
    let host: Arc<dyn BrowserHost> = browser.clone();
    let clock = Clock::manual(1_700_000_000_000);
    let db = Arc::new(Database::open_in_memory().expect("Failed to open database"));
    let mut router = EventRouter::new(&config, db.clone(), host.clone(), clock.clone());

    demo_install(&browser, &mut router).await;
    demo_suspend_cycle(&browser, &mut router, &clock).await;
    demo_protection(&browser, &mut router, &clock).await;
    demo_messages(&browser, &mut router).await;
    demo_commands(&browser, &mut router).await;
    demo_event_loop(config, db, host, clock).await;

    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("  ✅ Tab lifecycle demonstrated successfully!");
    println!("═══════════════════════════════════════════════════════════════");
}

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  📦 {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

async fn demo_install(browser: &SimulatedBrowser, router: &mut EventRouter) {
    section("Install");

    let window = browser.open_window(true);
    browser.open_tab(window, "https://docs.rs/tokio", "tokio - Rust");
    browser.open_tab(window, "https://news.ycombinator.com/", "Hacker News");
    browser.open_tab(window, "https://mail.example.com/", "Inbox");
    browser.open_tab(window, "https://radio.example.com/", "Radio");

    router
        .handle(BrowserEvent::Installed {
            reason: InstallReason::Install,
        })
        .await;

    println!("  Opened {} tabs in window {}", browser.tabs().len(), window);
    println!("  Context menus: {:?}", browser.context_menus());
    println!("  Armed suspend triggers: {:?}", router.scheduler().tracked_tabs().unwrap());
    println!("  ✓ Install OK");
    println!();
}

async fn demo_suspend_cycle(browser: &SimulatedBrowser, router: &mut EventRouter, clock: &Clock) {
    section("Suspend / Resume");

    clock.advance(41 * MINUTE_MS);
    let fired = router.tick().await;
    println!("  Advanced 41 minutes, {} triggers fired", fired);
    for tab in browser.tabs() {
        let state = if router.placeholder().is_placeholder(&tab.url) {
            "suspended"
        } else {
            "live"
        };
        println!("  Tab {} [{}] {}", tab.id, state, tab.title);
    }

    clock.advance(2_000);
    router.tick().await;
    println!("  Discarded after suspend: {:?}", browser.discarded());

    let news = 2;
    router
        .handle(BrowserEvent::Message {
            message: json!({"action": "resumeTab", "origUrl": "https://news.ycombinator.com/"}),
            sender: MessageSender::tab(news),
        })
        .await;
    println!("  Tab {} resumed to {}", news, browser.tab(news).unwrap().url);
    println!("  Suspended entries: {}", router.context().suspended.len());
    println!("  ✓ Suspend / Resume OK");
    println!();
}

async fn demo_protection(browser: &SimulatedBrowser, router: &mut EventRouter, clock: &Clock) {
    section("Protection");

    let window = browser.open_window(false);
    browser.open_tab(window, "https://example.com/", "Start");
    let pinned = browser.open_tab(window, "https://calendar.example.com/", "Calendar");
    browser.set_pinned(pinned, true);
    let form = browser.open_tab(window, "https://forms.example.com/new", "New issue");
    browser.set_page_state(
        form,
        PageState {
            form_dirty: true,
            ..PageState::default()
        },
    );

    for tab_id in [pinned, form] {
        let tab = browser.tab(tab_id).unwrap();
        router
            .handle(BrowserEvent::TabUpdated {
                tab_id,
                complete: true,
                tab,
            })
            .await;
    }
    clock.advance(41 * MINUTE_MS);
    router.tick().await;

    println!("  Pinned tab still at {}", browser.tab(pinned).unwrap().url);
    println!("  Tab with unsaved form still at {}", browser.tab(form).unwrap().url);
    println!("  ✓ Protection OK");
    println!();
}

async fn demo_messages(browser: &SimulatedBrowser, router: &mut EventRouter) {
    section("Messages");

    router
        .handle(BrowserEvent::Message {
            message: json!({"action": "updateTheme", "isDark": true}),
            sender: MessageSender::extension(),
        })
        .await;
    println!("  Theme broadcast reached {} placeholder tabs", browser.sent_messages().len());

    router
        .handle(BrowserEvent::Message {
            message: json!({"action": "updateSuspendTime", "minutes": 5}),
            sender: MessageSender::extension(),
        })
        .await;
    println!("  Suspend time now {} min", router.context().settings.suspend_time);

    router
        .handle(BrowserEvent::Message {
            message: json!({"action": "selfDestruct"}),
            sender: MessageSender::extension(),
        })
        .await;
    println!("  Unknown action rejected, core still running");
    println!("  ✓ Messages OK");
    println!();
}

async fn demo_commands(browser: &SimulatedBrowser, router: &mut EventRouter) {
    section("Commands");

    router
        .handle(BrowserEvent::Command {
            name: "whitelist-current-domain".to_string(),
        })
        .await;
    router
        .handle(BrowserEvent::Command {
            name: "whitelist-current-domain".to_string(),
        })
        .await;
    println!("  Whitelisted domains: {:?}", router.context().settings.whitelisted_domains);
    for notification in browser.notifications() {
        println!("  🔔 {}: {}", notification.title, notification.message);
    }
    println!("  ✓ Commands OK");
    println!();
}

async fn demo_event_loop(config: CoreConfig, db: Arc<Database>, host: Arc<dyn BrowserHost>, clock: Clock) {
    section("Event Loop");

    let mut app = App::with_database(config, db, host, clock);
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(BrowserEvent::Startup).expect("event loop is listening");
    drop(tx);
    app.run(rx).await;

    println!("  Restarted from persisted state: {} suspended tabs", app.router.context().suspended.len());
    println!("  ✓ Event Loop OK");
    println!();
}
