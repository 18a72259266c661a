use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use seraph_config::SeraphConfig;
use seraph_dap::runtime::{
    LineHooks, MockFrame, MockScriptContext, ScriptContext, ScriptValue, TypeId, TypeInfo,
    TypeKind,
};
use seraph_dap::Debugger;

/// Seraph debug adapter demo host.
///
/// Walks the lines of a script file as if a runtime were executing them, so an
/// editor can attach over DAP, set breakpoints and step through the file.
#[derive(Debug, Parser)]
#[command(name = "seraph-dap", version, about)]
struct Cli {
    /// Path to a TOML config file.
    ///
    /// If unset, `SERAPH_CONFIG` is used as a fallback. When neither are
    /// provided the adapter uses in-memory defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Interface to listen on (overrides the config file).
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides the config file).
    #[arg(long)]
    port: Option<u16>,

    /// Delay between executed lines.
    #[arg(long, default_value_t = 250)]
    line_delay_ms: u64,

    /// How many times to walk the script.
    #[arg(long, default_value_t = 1)]
    passes: u32,

    /// Script to walk.
    script: PathBuf,
}

const STRING_TYPE: u32 = 1;
const PASS_ADDRESS: usize = 0x1000;
const LINE_ADDRESS: usize = 0x2000;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.clone());
    if let Some(host) = cli.host.clone() {
        config.debugger.host = host;
    }
    if let Some(port) = cli.port {
        config.debugger.port = port;
    }
    seraph_dap::hardening::init(&config);

    let source = std::fs::read_to_string(&cli.script)
        .with_context(|| format!("failed to read script {}", cli.script.display()))?;
    let section = std::fs::canonicalize(&cli.script).unwrap_or_else(|_| cli.script.clone());

    let debugger = Debugger::new(&config.debugger);
    debugger.start()?;
    let hooks = LineHooks::new();
    debugger.install(&hooks);

    walk(
        &hooks,
        &section,
        &source,
        cli.passes,
        Duration::from_millis(cli.line_delay_ms),
    );

    debugger.uninstall(&hooks);
    debugger.stop();
    Ok(())
}

fn walk(hooks: &LineHooks, section: &Path, source: &str, passes: u32, delay: Duration) {
    let mock = Arc::new(MockScriptContext::new());
    mock.insert_type(
        STRING_TYPE,
        TypeInfo {
            name: "string".to_string(),
            properties: Vec::new(),
        },
    );
    mock.add_global("pass", TypeId::of(TypeKind::UInt32), PASS_ADDRESS);
    mock.push_frame(
        MockFrame::new("main", &section.display().to_string(), 1).with_local(
            "line",
            TypeId::object(STRING_TYPE),
            LINE_ADDRESS,
        ),
    );
    let context: Arc<dyn ScriptContext> = mock.clone();

    for pass in 1..=passes {
        mock.write_value(PASS_ADDRESS, ScriptValue::UInt(u64::from(pass)));
        for (index, text) in source.lines().enumerate() {
            let line = u32::try_from(index + 1).unwrap_or(u32::MAX);
            mock.set_line(line);
            mock.write_value(LINE_ADDRESS, ScriptValue::String(text.to_string()));
            hooks.dispatch(&context);
            std::thread::sleep(delay);
        }
        tracing::info!(target: "seraph.dap", pass, "finished script pass");
    }
}

fn load_config(cli_path: Option<PathBuf>) -> SeraphConfig {
    let path = cli_path.or_else(|| std::env::var_os("SERAPH_CONFIG").map(PathBuf::from));
    let Some(path) = path else {
        return SeraphConfig::default();
    };

    match SeraphConfig::load_from_path(&path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!(
                "seraph-dap: failed to load config from {}: {err}; continuing with defaults",
                path.display()
            );
            SeraphConfig::default()
        }
    }
}
