//! Command-line construction for the archiving tool
//!
//! Token order is fixed: boolean flags, valued flags, domain lists, the
//! output destination, then the content source as the final positional.

use super::options::{non_blank, ArchiveOptions, ContentSource};

/// Positional token telling the tool to read the document from stdin
pub const STDIN_MARKER: &str = "-";

/// Boolean toggles paired with their flags, in emission order
const fn switches(options: &ArchiveOptions) -> [(bool, &'static str); 14] {
    [
        (options.exclude_audio, "-a"),
        (options.exclude_css, "-c"),
        (options.exclude_images, "-i"),
        (options.exclude_js, "-j"),
        (options.exclude_fonts, "-F"),
        (options.exclude_videos, "-v"),
        (options.omit_frames, "-f"),
        (options.isolate, "-I"),
        (options.extract_no_script, "-n"),
        (options.mhtml, "-m"),
        (options.no_metadata, "-M"),
        (options.ignore_network_errors, "-e"),
        (options.accept_invalid_certs, "-k"),
        (options.quiet, "-q"),
    ]
}

/// Build the full argument list for one archive run
pub fn build_args(options: &ArchiveOptions, source: &ContentSource) -> Vec<String> {
    let mut args = Vec::new();

    for (is_set, flag) in switches(options) {
        if is_set {
            args.push(flag.to_string());
        }
    }

    push_value(&mut args, "-b", options.base_url.as_deref());
    push_value(&mut args, "-u", options.user_agent.as_deref());
    if let Some(timeout) = options.timeout_seconds {
        args.push("-t".to_string());
        args.push(timeout.to_string());
    }
    push_value(&mut args, "-C", options.cookies_file.as_deref());
    push_value(&mut args, "-E", options.encoding.as_deref());

    push_repeated(&mut args, "-d", &options.allow_domains);
    push_repeated(&mut args, "-B", &options.block_domains);

    // Output always goes to stdout so it can be captured
    args.push("-o".to_string());
    args.push("-".to_string());

    args.push(match source {
        ContentSource::Url(url) => url.clone(),
        ContentSource::Html(_) => STDIN_MARKER.to_string(),
    });

    args
}

fn push_value(args: &mut Vec<String>, flag: &str, value: Option<&str>) {
    if let Some(value) = non_blank(value) {
        args.push(flag.to_string());
        args.push(value.to_string());
    }
}

fn push_repeated(args: &mut Vec<String>, flag: &str, values: &[String]) {
    for value in values.iter().filter(|v| !v.trim().is_empty()) {
        args.push(flag.to_string());
        args.push(value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url_source() -> ContentSource {
        ContentSource::Url("https://example.com/page".to_string())
    }

    fn count(args: &[String], token: &str) -> usize {
        args.iter().filter(|a| *a == token).count()
    }

    fn all_switches_on() -> ArchiveOptions {
        ArchiveOptions {
            exclude_audio: true,
            exclude_css: true,
            exclude_images: true,
            exclude_js: true,
            exclude_fonts: true,
            exclude_videos: true,
            omit_frames: true,
            isolate: true,
            extract_no_script: true,
            mhtml: true,
            no_metadata: true,
            ignore_network_errors: true,
            accept_invalid_certs: true,
            quiet: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_only_output_and_source() {
        let args = build_args(&ArchiveOptions::default(), &url_source());
        assert_eq!(args, vec!["-o", "-", "https://example.com/page"]);
    }

    #[test]
    fn test_all_switches_in_order() {
        let args = build_args(&all_switches_on(), &url_source());
        assert_eq!(
            args,
            vec![
                "-a", "-c", "-i", "-j", "-F", "-v", "-f", "-I", "-n", "-m", "-M", "-e", "-k",
                "-q", "-o", "-", "https://example.com/page",
            ]
        );
    }

    #[test]
    fn test_each_switch_exactly_once_when_set() {
        let options = all_switches_on();
        let args = build_args(&options, &url_source());
        for (_, flag) in switches(&options) {
            assert_eq!(count(&args, flag), 1, "flag {flag}");
        }
    }

    #[test]
    fn test_single_switch_isolated() {
        let options = ArchiveOptions {
            extract_no_script: true,
            ..Default::default()
        };
        let args = build_args(&options, &url_source());
        assert_eq!(count(&args, "-n"), 1);
        for (_, flag) in switches(&options).into_iter().filter(|(_, f)| *f != "-n") {
            assert_eq!(count(&args, flag), 0, "flag {flag}");
        }
    }

    #[test]
    fn test_valued_flags() {
        let options = ArchiveOptions {
            base_url: Some("https://base.example/".to_string()),
            user_agent: Some("Mozilla/5.0 (X11)".to_string()),
            timeout_seconds: Some(45),
            cookies_file: Some("/tmp/cookies.txt".to_string()),
            encoding: Some("utf-8".to_string()),
            ..Default::default()
        };
        let args = build_args(&options, &url_source());
        assert_eq!(
            args,
            vec![
                "-b",
                "https://base.example/",
                "-u",
                "Mozilla/5.0 (X11)",
                "-t",
                "45",
                "-C",
                "/tmp/cookies.txt",
                "-E",
                "utf-8",
                "-o",
                "-",
                "https://example.com/page",
            ]
        );
    }

    #[test]
    fn test_blank_values_skipped() {
        let options = ArchiveOptions {
            user_agent: Some("  ".to_string()),
            encoding: Some(String::new()),
            allow_domains: vec![String::new()],
            ..Default::default()
        };
        let args = build_args(&options, &url_source());
        assert_eq!(args, vec!["-o", "-", "https://example.com/page"]);
    }

    #[test]
    fn test_domain_lists_preserve_order() {
        let options = ArchiveOptions {
            allow_domains: vec!["b.com".to_string(), "a.com".to_string()],
            block_domains: vec!["ads.net".to_string(), "track.io".to_string()],
            ..Default::default()
        };
        let args = build_args(&options, &url_source());
        assert_eq!(
            args,
            vec![
                "-d", "b.com", "-d", "a.com", "-B", "ads.net", "-B", "track.io", "-o", "-",
                "https://example.com/page",
            ]
        );
    }

    #[test]
    fn test_output_destination_exactly_once() {
        let options = ArchiveOptions {
            mhtml: true,
            block_domains: vec!["x.com".to_string()],
            ..Default::default()
        };
        let args = build_args(&options, &url_source());
        assert_eq!(count(&args, "-o"), 1);
        let pos = args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(args[pos + 1], "-");
    }

    #[test]
    fn test_stdin_source_uses_marker() {
        let source = ContentSource::Html("<html></html>".to_string());
        let args = build_args(&ArchiveOptions::default(), &source);
        assert_eq!(args.last().map(String::as_str), Some(STDIN_MARKER));
        assert!(!args.iter().any(|a| a.contains("<html>")));
    }

    #[test]
    fn test_values_are_not_split() {
        let options = ArchiveOptions {
            user_agent: Some("a; rm -rf / && echo".to_string()),
            ..Default::default()
        };
        let args = build_args(&options, &url_source());
        assert_eq!(args[1], "a; rm -rf / && echo");
    }
}
