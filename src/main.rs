use costwatch::utils::load_config;
use costwatch::{build_server, init_logger};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("❌ costwatch 启动失败: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = load_config()?;
    init_logger(&config.log)?;

    let server = build_server(&config)?;
    let addr = server.start().await?;
    tracing::info!(%addr, "等待请求，按 Ctrl-C 退出");

    tokio::signal::ctrl_c().await?;
    tracing::info!("收到退出信号");
    server.stop().await;

    Ok(())
}
