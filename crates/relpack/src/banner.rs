/// Version segment rendered when the repository head cannot be resolved.
const UNKNOWN_VERSION: &str = "unknown";

/// Compose the license-and-version banner stamped onto every released
/// artifact. The `/*!` opener marks it as an "important" comment so the
/// minifier retains it.
pub fn compose(product: &str, semver: &str, commit: Option<&str>) -> String {
    let header_version = format!("{}({})", semver, commit.unwrap_or(UNKNOWN_VERSION));
    [
        "/*!-----------------------------------------------------------------------------".to_owned(),
        format!(" * {} version: {}", product, header_version),
        " * Released under the MIT license".to_owned(),
        " *-----------------------------------------------------------------------------*/".to_owned(),
        String::new(),
    ]
    .join("\n")
}

/// Prepend the banner to artifact content. This is a pure text transform,
/// deliberately independent of the bundler.
pub fn prepend(banner: &str, content: &str) -> String {
    format!("{}{}", banner, content)
}
