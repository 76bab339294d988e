//! Download naming and response header values.

/// Content type of every remuxed download.
pub const MP4_CONTENT_TYPE: &str = "video/mp4";

/// Strips everything but ASCII letters, digits, `_` and whitespace.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect()
}

/// Download filename for `title` at `quality`.
///
/// ```
/// use tubemux_core::delivery::download_filename;
///
/// assert_eq!(download_filename("My Clip: Part 1!", "720p"), "My Clip Part 1_720p.mp4");
/// ```
pub fn download_filename(title: &str, quality: &str) -> String {
    format!("{}_{}.mp4", sanitize_title(title), sanitize_title(quality))
}

/// `Content-Disposition` value offering the download as an attachment.
pub fn content_disposition(title: &str, quality: &str) -> String {
    let filename = download_filename(title, quality);
    format!("attachment; filename=\"{}\"", urlencoding::encode(&filename))
}
