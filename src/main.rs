use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use routile;

#[derive(Parser)]
struct Cli {
    /// The path to the binary map file
    map_file: PathBuf,

    /// Latitude of the start point
    start_lat: f64,

    /// Longitude of the start point
    start_lon: f64,

    /// Latitude of the end point
    end_lat: f64,

    /// Longitude of the end point
    end_lon: f64,

    /// Routing profile: car, bicycle or pedestrian
    #[arg(long, default_value = "car")]
    profile: String,

    /// Override the tile cache memory ceiling, in MiB
    #[arg(long)]
    memory_limit_mb: Option<usize>,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    colog::init();
    let cli = Cli::parse();

    let map = routile::MapFile::open(&cli.map_file)?;
    let rules = routile::RuleSet::default_rules();
    let profile = rules
        .profile(&cli.profile)
        .ok_or_else(|| format!("unknown profile: {}", cli.profile))?;

    let mut config = routile::RoutingConfig::from_profile(profile);
    if let Some(limit) = cli.memory_limit_mb {
        config.memory_limit = limit * 1024 * 1024;
    }

    let mut ctx = routile::RoutingContext::new(&map, profile, config);
    let start = routile::Point31::from_lat_lon(cli.start_lat, cli.start_lon);
    let end = routile::Point31::from_lat_lon(cli.end_lat, cli.end_lon);
    let route = routile::find_route(&mut ctx, start, end, &routile::NoObserver)?;

    println!("{{");
    println!("  \"type\": \"FeatureCollection\",");
    println!("  \"features\": [");

    let mut steps = route.iter().peekable();
    while let Some(step) = steps.next() {
        println!("    {{");
        println!("      \"type\": \"Feature\",");
        println!("      \"properties\": {{");
        println!("        \"road\": {},", step.road_id);
        println!("        \"name\": \"{}\",", escape(step.name.as_deref().unwrap_or("")));
        println!(
            "        \"turn\": \"{}\",",
            step.turn
                .as_ref()
                .map(|t| t.kind.to_string())
                .unwrap_or_else(|| "depart".to_string())
        );
        println!("        \"distance\": {:.1},", step.distance);
        println!("        \"time\": {:.1}", step.time);
        println!("      }},");

        println!("      \"geometry\": {{");
        println!("        \"type\": \"LineString\",");
        println!("        \"coordinates\": [");
        let mut points = step.points.iter().peekable();
        while let Some(point) = points.next() {
            let suffix = if points.peek().is_some() { "," } else { "" };
            println!("          [{}, {}]{}", point.lon(), point.lat(), suffix);
        }
        println!("        ]");
        println!("      }}");

        let suffix = if steps.peek().is_some() { "," } else { "" };
        println!("    }}{}", suffix);
    }

    println!("  ]");
    println!("}}");

    Ok(())
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
