//! Channel post rendering.
//!
//! [`PostTemplate`] turns an ad snapshot and its tariff into Telegram HTML.
//! Rendering is pure: the same ad, tariff, status and surface always yield
//! byte-identical output. All user-provided text passes through
//! [`escape_html`] before it is placed into markup.
//!
//! Line order:
//!
//! 1. `🚗 <b>brand model [modification]</b>`
//! 2. `<b>year</b>`
//! 3. `<b>engine (power л.с.)</b>` if both are present
//! 4. `<b>mileage тыс. км</b>`
//! 5. `<b>drivetrain</b>` if present
//! 6. `<b>description</b>` if non-empty
//! 7. `city` if present
//! 8. `💰 <b>price ₽</b>`
//! 9. phone and handle lines, or a status banner once the ad left `Active`
//! 10. the VIP banner for the top tier

use crate::entities::ads::Ad;
use crate::entities::{AdStatus, Tariff};

/// Telegram's caption limit.
pub const CAPTION_LIMIT: usize = 1024;
/// Length a too-long caption is cut to before the ellipsis.
pub const CAPTION_TRUNCATE_TO: usize = 1020;
pub const ELLIPSIS: &str = "...";

const VIP_BANNER: &str = "⭐ <b>VIP ОБЪЯВЛЕНИЕ</b> ⭐";
const WITHDRAWN_BANNER: &str = "❌ <b>СНЯТО С ПРОДАЖИ</b>";
const SOLD_BANNER: &str = "✅ <b>ПРОДАНО</b>";

/// Where the rendered text is going to be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Photo caption, limited to [`CAPTION_LIMIT`] characters.
    Caption,
    /// Standalone text message, never truncated.
    Message,
}

/// Builder for a channel post body.
#[derive(Debug, Clone, Copy)]
pub struct PostTemplate<'a> {
    ad: &'a Ad,
    tariff: Tariff,
    status: AdStatus,
}

impl<'a> PostTemplate<'a> {
    pub fn new(ad: &'a Ad, tariff: Tariff) -> Self {
        Self {
            ad,
            tariff,
            status: AdStatus::Active,
        }
    }

    /// Render for `status`: anything but `Active` replaces the contact
    /// lines with a status banner.
    pub fn with_status(mut self, status: AdStatus) -> Self {
        self.status = status;
        self
    }

    pub fn render(&self, surface: Surface) -> String {
        let text = self.render_full();
        match surface {
            Surface::Message => text,
            Surface::Caption => truncate_caption(&text),
        }
    }

    fn render_full(&self) -> String {
        let ad = self.ad;
        let mut lines: Vec<String> = Vec::with_capacity(12);

        let mut header = format!("{} {}", escape_html(&ad.brand), escape_html(&ad.model));
        if let Some(modification) = present(&ad.modification) {
            header.push(' ');
            header.push_str(&escape_html(modification));
        }
        lines.push(format!("🚗 <b>{header}</b>"));

        lines.push(bold(&ad.year));

        if let (Some(engine), Some(power)) = (present(&ad.engine), present(&ad.power)) {
            lines.push(format!(
                "<b>{} ({} л.с.)</b>",
                escape_html(engine),
                escape_html(power)
            ));
        }

        lines.push(format!("<b>{} тыс. км</b>", escape_html(ad.mileage.trim())));

        if let Some(drivetrain) = present(&ad.drivetrain) {
            lines.push(bold(drivetrain));
        }

        if !ad.description.trim().is_empty() {
            lines.push(bold(ad.description.trim()));
        }

        if let Some(city) = present(&ad.city) {
            lines.push(escape_html(city));
        }

        lines.push(format!("💰 <b>{}</b>", escape_html(&format_price(&ad.price))));

        match self.status {
            AdStatus::Active => {
                if ad.show_phone
                    && let Some(phone) = present(&ad.phone)
                {
                    lines.push(format!("📞 {}", bold(phone)));
                }
                if ad.show_telegram
                    && let Some(handle) = present(&ad.telegram)
                {
                    let handle = handle.trim_start_matches('@');
                    lines.push(format!("📨 <b>@{}</b>", escape_html(handle)));
                }
            }
            AdStatus::Inactive => lines.push(WITHDRAWN_BANNER.to_string()),
            AdStatus::Deleted => lines.push(SOLD_BANNER.to_string()),
        }

        if self.tariff.is_top_tier() {
            lines.push(String::new());
            lines.push(VIP_BANNER.to_string());
        }

        lines.join("\n")
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn bold(value: &str) -> String {
    format!("<b>{}</b>", escape_html(value.trim()))
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// `1500000` → `1 500 000 ₽`. Prices that are not plain digits are kept as given.
pub fn format_price(price: &str) -> String {
    let digits: String = price.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return price.trim().to_string();
    }
    let digits = digits.trim_start_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 4);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    grouped.push_str(" ₽");
    grouped
}

/// Cut a caption that exceeds [`CAPTION_LIMIT`] to [`CAPTION_TRUNCATE_TO`]
/// characters and append [`ELLIPSIS`].
///
/// The cut never lands inside a tag or an entity, and an unclosed `<b>` is
/// closed before the ellipsis, inside the same budget.
pub fn truncate_caption(text: &str) -> String {
    if text.chars().count() <= CAPTION_LIMIT {
        return text.to_string();
    }

    let mut budget = CAPTION_TRUNCATE_TO;
    loop {
        let mut cut: String = text.chars().take(budget).collect();
        if let Some(lt) = cut.rfind('<')
            && !cut[lt..].contains('>')
        {
            cut.truncate(lt);
        }
        if let Some(amp) = cut.rfind('&')
            && !cut[amp..].contains(';')
        {
            cut.truncate(amp);
        }

        let open = cut
            .matches("<b>")
            .count()
            .saturating_sub(cut.matches("</b>").count());
        let closing = "</b>".repeat(open);
        let length = cut.chars().count() + closing.len();
        if length <= CAPTION_TRUNCATE_TO || budget == 0 {
            return format!("{cut}{closing}{ELLIPSIS}");
        }
        budget = budget.saturating_sub(length - CAPTION_TRUNCATE_TO);
    }
}
