use ipstamp::cli::CliOverrides;
use ipstamp::command;
use ipstamp::config::AppConfig;
use ipstamp::host::{ConsoleEditor, LocalDrawings};
use ipstamp::idle::IdleQueue;
use ipstamp::journal::Journal;
use ipstamp::scene::SceneDb;
use ipstamp::ui_session::ConsoleProgress;

const DEFAULT_CONFIG_PATH: &str = "ipstamp.json";

fn main() {
    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    let config_path =
        cli.config_path().cloned().unwrap_or_else(|| DEFAULT_CONFIG_PATH.into());
    let mut config = AppConfig::load_or_default(config_path);
    config.apply_overrides(&cli.into_config_overrides());

    let journal = match &config.journal.path {
        Some(path) => Journal::at_path(path.clone()),
        None => Journal::default_location(),
    };
    let editor = ConsoleEditor::new();
    let mut idle = IdleQueue::new();
    let mut doc = SceneDb::new();
    let mut drawings = LocalDrawings::new();

    command::initialize(&editor, &mut idle, &journal);
    idle.run_idle();
    command::run_ip_stamp(&mut doc, &mut drawings, &editor, &config, &journal, |_| {
        Ok(ConsoleProgress::new("Loading drawing"))
    });
}
