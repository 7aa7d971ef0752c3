mod cli;
mod commands;
mod env_loader;
mod error;
mod logging;
mod reaper;
mod slack;

fn main() {
    let env_file = env_loader::load_dotenv();

    if let Err(err) = cli::run(env_file.as_deref()) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
