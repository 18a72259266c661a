use std::sync::Once;

use seraph_config::{init_tracing_with_config, SeraphConfig};

static PANIC_HOOK: Once = Once::new();

/// Initialize structured logging and install a process-wide panic hook.
///
/// Request handlers still isolate panics locally with `catch_unwind`; the hook
/// makes sure a panic on any thread, including the script thread, lands in
/// the log before the previous hook runs.
pub fn init(config: &SeraphConfig) {
    init_tracing_with_config(config);
    install_panic_hook();
}

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let location = info.location().map(|loc| loc.to_string());
            tracing::error!(
                target: "seraph.dap",
                location = location.as_deref().unwrap_or("<unknown>"),
                message = %panic_message(info),
                "panic"
            );
            previous(info);
        }));
    });
}

fn panic_message(info: &std::panic::PanicHookInfo<'_>) -> String {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "panic payload (non-string)".to_owned()
    }
}
