use std::path::PathBuf;

use clap::Parser;

use cdident::formats::open_image;
use cdident::{load_content, validate, DiscSet, RegionDetector};

#[derive(Parser)]
#[command(version, about = "Identify a CD image or an M3U playlist of images", long_about = None)]
struct Args {
    #[arg(help = "A .cue or .iso image, or an .m3u playlist")]
    content: PathBuf,

    #[arg(long, help = "Skip the Q subchannel check")]
    no_check: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase the log level")]
    verbose: u8,
}

fn main() {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut set = DiscSet::new();

    let loaded = match load_content(&mut set, &args.content, &mut open_image) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Can't load {}: {}", args.content.display(), e);
            std::process::exit(1);
        }
    };

    for i in 0..set.len() {
        if let Ok(disc) = set.disc(i) {
            let toc = disc.toc();

            println!(
                "Disc {}: {} image, tracks {}-{}, lead-out at {}",
                i + 1,
                disc.image_format(),
                toc.first_track,
                toc.last_track,
                toc.lead_out_lba()
            );
        }
    }

    println!("Layout MD5:      {}", loaded.layout_hash);
    println!("Content MD5:     {}", loaded.identity.content_hash);
    println!("First disc MD5:  {}", loaded.identity.first_disc_hash);
    println!("Short game ID:   \"{}\"", loaded.identity.short_game_id);

    match RegionDetector::saturn().detect_mask(&mut set) {
        Some(mask) => println!("Saturn regions:  {:?}", mask),
        None => println!("Saturn regions:  not a Saturn disc"),
    }

    if !args.no_check {
        let ok = validate::validate(&mut set);

        println!("Subchannel:      {}", if ok { "OK" } else { "BAD" });

        if !ok {
            std::process::exit(2);
        }
    }
}
