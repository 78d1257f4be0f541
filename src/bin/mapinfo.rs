use std::env;
use std::process::ExitCode;

use mapsforge_reader::MapFile;

fn main() -> ExitCode {
    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: mapinfo <file.map>");
        return ExitCode::FAILURE;
    };

    let map_file = match MapFile::open(&path) {
        Ok(map_file) => map_file,
        Err(err) => {
            eprintln!("error opening {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let info = map_file.map_file_info();
    println!("Map file: {path}");
    println!("  Version: {}", info.file_version);
    println!("  File size: {}", info.file_size);
    println!("  Map date: {}", info.map_date);
    println!("  Bounds: {:?}", info.bounding_box);
    println!("  Projection: {}", info.projection_name);
    println!("  Tile size: {}", info.tile_pixel_size);
    println!(
        "  Zoom levels: {} to {}",
        info.zoom_level_min, info.zoom_level_max
    );
    println!("  Sub-files: {}", info.number_of_sub_files);
    println!("  POI tags: {}", info.poi_tags.len());
    println!("  Way tags: {}", info.way_tags.len());
    println!("  Debug file: {}", info.debug_file);

    if let Some(position) = &info.start_position {
        println!("  Start position: {position:?}");
    }
    if let Some(zoom) = info.start_zoom_level {
        println!("  Start zoom: {zoom}");
    }
    if let Some(languages) = &info.languages_preference {
        println!("  Languages: {languages}");
    }
    if let Some(comment) = &info.comment {
        println!("  Comment: {comment}");
    }
    if let Some(created_by) = &info.created_by {
        println!("  Created by: {created_by}");
    }

    ExitCode::SUCCESS
}
