use {
    anyhow::{Context, Result},
    qrcode::{QrCode, render::unicode},
};

/// QR code for `url` drawn with half-block characters, light on dark so it
/// scans from a dark terminal.
pub fn render(url: &str) -> Result<String> {
    let code = QrCode::new(url.as_bytes()).context("url too long for a QR code")?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .quiet_zone(true)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_square_block() {
        let art = render("http://192.168.1.20:5000").unwrap();
        let lines: Vec<&str> = art.lines().collect();
        assert!(lines.len() > 10);
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
    }
}
