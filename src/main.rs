use ChemCalc::Examples::chem_examples::chem_examples;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

pub fn main() {
    TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .unwrap_or_else(|e| eprintln!("logger is not initialised: {}", e));
    //
    let task: usize = 3;
    chem_examples(task);
}
