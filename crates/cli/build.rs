use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let identify = clap::Command::new("identify")
        .about("Search for book records by title, author or identifier")
        .arg(clap::arg!(-t --title <TITLE> "Book title; prefix with '=' for an exact-match search"))
        .arg(clap::arg!(-a --author <AUTHOR> "Author name"))
        .arg(clap::arg!(--isbn <ISBN> "ISBN-10 or ISBN-13"))
        .arg(clap::arg!(--publication <ID> "ISFDB publication record id"))
        .arg(clap::arg!(--title_id <ID> "ISFDB title record id"))
        .arg(clap::arg!(-n --max_results <NUM> "Maximum number of results").default_value("25"))
        .arg(clap::arg!(--exact "Force exact-match search terms"))
        .arg(clap::arg!(--language <CODE> "ISO 639-2 language kept besides English").default_value("eng"))
        .arg(clap::arg!(--combine_series "Fold sub-series names into their parent series"))
        .arg(clap::arg!(--unwanted_tag <TAG> "Tag dropped from results"));

    let covers = clap::Command::new("covers")
        .about("List cover image URLs for a book")
        .arg(clap::arg!(-t --title <TITLE> "Book title"))
        .arg(clap::arg!(-a --author <AUTHOR> "Author name"))
        .arg(clap::arg!(--isbn <ISBN> "ISBN-10 or ISBN-13"))
        .arg(clap::arg!(--publication <ID> "ISFDB publication record id"))
        .arg(clap::arg!(--title_id <ID> "ISFDB title record id"))
        .arg(clap::arg!(-n --max_covers <NUM> "Maximum number of cover URLs").default_value("10"));

    let mut cmd = clap::Command::new("fabula")
        .version("1.0.0")
        .about("Look up book metadata on ISFDB")
        .arg(clap::arg!(--json "Emit results as JSON instead of formatted text"))
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("30"))
        .arg(clap::arg!(--base_url <URL> "Base URL of the ISFDB instance"))
        .arg(
            clap::arg!(--cache <FILE> "Cache file, restored on start and rewritten on exit")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(-v --verbose "Enable debug logging"))
        .subcommand(identify)
        .subcommand(covers);

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "fabula", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "fabula", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "fabula", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "fabula", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
