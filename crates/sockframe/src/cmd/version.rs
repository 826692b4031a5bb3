use sockframe_frame::{DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_WIRE_SIZE};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("sockframe {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: sockframe");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("SOCKFRAME_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("max_wire_size: {DEFAULT_MAX_WIRE_SIZE}");
    println!("buffer_capacity: {DEFAULT_BUFFER_CAPACITY}");
    println!(
        "features: select={}, async={}, cli=true",
        cfg!(feature = "select"),
        cfg!(feature = "async")
    );

    Ok(SUCCESS)
}
