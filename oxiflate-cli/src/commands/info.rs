//! Info command implementation.

use crate::utils::format_size;
use oxiflate_stream::gzip::{FOOTER_SIZE, flags};
use oxiflate_stream::GzipHeader;
use std::fs;
use std::path::Path;

fn os_name(os: u8) -> &'static str {
    match os {
        0 => "FAT",
        3 => "Unix",
        7 => "Macintosh",
        11 => "NTFS",
        255 => "unknown",
        _ => "other",
    }
}

fn flag_names(value: u8) -> String {
    let names: Vec<&str> = [
        (flags::FTEXT, "FTEXT"),
        (flags::FHCRC, "FHCRC"),
        (flags::FEXTRA, "FEXTRA"),
        (flags::FNAME, "FNAME"),
        (flags::FCOMMENT, "FCOMMENT"),
    ]
    .into_iter()
    .filter(|(bit, _)| value & bit != 0)
    .map(|(_, name)| name)
    .collect();

    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(" | ")
    }
}

/// Print the GZIP header and trailer of `input`.
pub fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let Some((header, header_len)) = GzipHeader::parse(&data)? else {
        return Err("truncated GZIP header".into());
    };

    println!("File:        {}", input.display());
    println!("Size:        {}", format_size(data.len() as u64));
    println!("Header:      {} bytes", header_len);
    println!("Flags:       {}", flag_names(header.flags));
    println!("MTime:       {}", header.mtime);
    println!("XFL:         {}", header.xfl);
    println!("OS:          {} ({})", os_name(header.os), header.os);
    if let Some(name) = &header.filename {
        println!("Name:        {}", name);
    }
    if let Some(comment) = &header.comment {
        println!("Comment:     {}", comment);
    }
    if let Some(extra) = &header.extra {
        println!("Extra:       {} bytes", extra.len());
    }

    if data.len() >= header_len + FOOTER_SIZE {
        let trailer = &data[data.len() - FOOTER_SIZE..];
        let crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let isize = u32::from_le_bytes([trailer[4], trailer[5], trailer[6], trailer[7]]);
        println!("CRC32:       {:08x}", crc);
        println!("Original:    {}", format_size(u64::from(isize)));
    } else {
        println!("Trailer:     missing");
    }
    Ok(())
}
