//! Caption generation - turns a product into platform-ready promotional text
//!
//! Generation is pure and deterministic: the same product, platform and
//! style always produce the same caption. When the platform's length cap
//! forces cuts, the description goes first, then trailing hashtags, then
//! the price line, then the title is shortened. The affiliate link and the
//! disclosure tag are never dropped or truncated.

use crate::model::{Platform, Product};

/// Hashtag set the original campaign ran with
pub const DEFAULT_HASHTAGS: [&str; 10] = [
    "#AmazonFinds",
    "#BestDeals",
    "#Shopping",
    "#ProductReview",
    "#AffiliateMarketing",
    "#OnlineShopping",
    "#DailyDeals",
    "#BestSellers",
    "#TrendingNow",
    "#MustHave",
];

const SECTION_SEP: &str = "\n\n";
/// Below this many remaining characters a truncated description adds noise
/// instead of information, so the section is dropped instead
const MIN_DESCRIPTION_CHARS: usize = 12;

/// Configuration for caption generation
#[derive(Debug, Clone)]
pub struct CaptionStyle {
    /// Candidate hashtags, most important first
    pub hashtags: Vec<String>,
    /// Advertising disclosure tag, always present in the output
    pub disclosure: String,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            hashtags: DEFAULT_HASHTAGS.iter().map(|s| s.to_string()).collect(),
            disclosure: "#ad".to_string(),
        }
    }
}

/// Caption generator for all supported platforms
#[derive(Clone)]
pub struct CaptionGenerator {
    style: CaptionStyle,
}

impl CaptionGenerator {
    pub fn new(style: CaptionStyle) -> Self {
        Self { style }
    }

    /// Generate the caption for one product on one platform
    pub fn generate(&self, product: &Product, platform: Platform) -> String {
        let max = platform.max_caption_chars();
        let link_line = format!("Shop now: {}", product.affiliate_url);

        let mut hashtags: Vec<&str> = self
            .style
            .hashtags
            .iter()
            .map(String::as_str)
            .take(hashtag_budget(platform))
            .collect();

        let mut title = product.title.clone();
        let mut price_line = product.price.as_ref().map(|p| format!("Price: {p}"));
        let mut description = product
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        // The description absorbs the overflow first.
        let fixed = self.assembled_chars(&title, &price_line, None, &link_line, &hashtags);
        if let Some(desc) = &description {
            let budget = max.saturating_sub(fixed + chars(SECTION_SEP));
            if budget < MIN_DESCRIPTION_CHARS {
                description = None;
            } else if chars(desc) > budget {
                description = Some(truncate_to_chars(desc, budget));
            }
        }

        // Then trailing hashtags go, one at a time.
        while !hashtags.is_empty()
            && self.assembled_chars(&title, &price_line, description.as_deref(), &link_line, &hashtags)
                > max
        {
            hashtags.pop();
        }

        // Then the price line.
        if price_line.is_some()
            && self.assembled_chars(&title, &price_line, description.as_deref(), &link_line, &hashtags)
                > max
        {
            price_line = None;
        }

        // The title is shortened only as a last resort; the link and the
        // disclosure stay whole no matter what.
        let over = self
            .assembled_chars(&title, &price_line, description.as_deref(), &link_line, &hashtags)
            .saturating_sub(max);
        if over > 0 {
            let budget = chars(&title).saturating_sub(over);
            title = truncate_to_chars(&title, budget);
        }

        self.assemble(&title, &price_line, description.as_deref(), &link_line, &hashtags)
    }

    fn assemble(
        &self,
        title: &str,
        price_line: &Option<String>,
        description: Option<&str>,
        link_line: &str,
        hashtags: &[&str],
    ) -> String {
        let mut sections: Vec<String> = Vec::new();

        let mut head = title.to_string();
        if let Some(price) = price_line {
            head.push('\n');
            head.push_str(price);
        }
        if !head.is_empty() {
            sections.push(head);
        }

        if let Some(desc) = description {
            sections.push(desc.to_string());
        }

        sections.push(link_line.to_string());

        let mut tags_line = self.style.disclosure.clone();
        for tag in hashtags {
            tags_line.push(' ');
            tags_line.push_str(tag);
        }
        sections.push(tags_line);

        sections.join(SECTION_SEP)
    }

    fn assembled_chars(
        &self,
        title: &str,
        price_line: &Option<String>,
        description: Option<&str>,
        link_line: &str,
        hashtags: &[&str],
    ) -> usize {
        chars(&self.assemble(title, price_line, description, link_line, hashtags))
    }
}

/// Hashtags worth carrying per platform; Pinterest and Facebook reward
/// far fewer tags than Instagram
fn hashtag_budget(platform: Platform) -> usize {
    match platform {
        Platform::Instagram => 10,
        Platform::Facebook => 5,
        Platform::Pinterest => 4,
    }
}

fn chars(s: &str) -> usize {
    s.chars().count()
}

/// Truncate to at most `max_chars`, preferring a word boundary, appending
/// `...` when anything was cut
fn truncate_to_chars(text: &str, max_chars: usize) -> String {
    if chars(text) <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }

    let keep = max_chars - 3;
    let byte_end = text
        .char_indices()
        .nth(keep)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let head = &text[..byte_end];
    let break_point = head.rfind(char::is_whitespace).unwrap_or(byte_end);

    format!("{}...", head[..break_point].trim_end())
}
