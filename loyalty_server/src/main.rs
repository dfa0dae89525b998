use clap::Parser;
use dotenvy::dotenv;
use log::info;
use loyalty_server::{
    cli::{display_envs, Arguments},
    config::ServerConfig,
    server::run_server,
};

#[actix_web::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let args = Arguments::parse();
    if args.show_env {
        display_envs();
        return;
    }
    let mut config = ServerConfig::from_env_or_default();
    if let Err(e) = args.apply_to(&mut config) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    info!("🚀️ Starting server on {}:{}", config.host, config.port);
    match run_server(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}
