use anyhow::Result;
use release_packager::{logging, timestamp, BuildInfo};

fn main() -> Result<()> {
    logging::init();
    let args: Vec<String> = std::env::args().skip(1).collect();

    let info = BuildInfo::from_args(&args, timestamp::now())?;
    tracing::debug!(version = %info.version, build = info.build, "emitting build info");
    print!("{}", info.to_json()?);
    Ok(())
}
