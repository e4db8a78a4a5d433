use std::path::Path;

use mashup_media::{check_ffmpeg, check_ffprobe, check_ytdlp};
use mashup_worker::PipelineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = PipelineConfig::from_env()?;

    println!(
        "mashup-selfcheck: starting with work_root={}",
        config.work_root.display()
    );
    ensure_work_root(&config.work_root).await?;
    ensure_tool("ffmpeg", check_ffmpeg())?;
    ensure_tool("ffprobe", check_ffprobe())?;
    ensure_tool("yt-dlp", check_ytdlp())?;

    println!("mashup-selfcheck: ok");
    Ok(())
}

async fn ensure_work_root(path: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path).await?;
    let probe = path.join(format!(".mashup-selfcheck-{}", std::process::id()));
    tokio::fs::write(&probe, b"ok")
        .await
        .map_err(|e| anyhow::anyhow!("work root {} not writable: {}", path.display(), e))?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}

fn ensure_tool(name: &str, found: mashup_media::MediaResult<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = found.map_err(|e| anyhow::anyhow!("{} not available: {}", name, e))?;
    println!("mashup-selfcheck: {} at {}", name, path.display());
    Ok(())
}
