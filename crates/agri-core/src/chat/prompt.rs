//! System instructions for the agriculture advisor

/// Rendered in place of the crop when the caller doesn't name one
pub const CROP_NOT_SPECIFIED: &str = "not specified";

const INSTRUCTIONS: &str = "\
You are a practical agriculture expert helping Indian farmers.

Output format:
- Use Markdown.
- Use headings (##), bullet points (-), and numbered steps (1., 2., 3.).
- Separate sections with blank lines.

Content rules:
- Step-by-step advice
- Organic & low-cost options first
- Mention Kharif/Rabi/Zaid when relevant
- For pests: prevention + treatment
- For selling: mandi, FPOs, processors, exporters

Rules:
- Give step-by-step advice.
- Mention local season (Kharif/Rabi/Zaid) if relevant.
- Suggest organic and low-cost options first.
- For pests/diseases: suggest prevention + treatment.
- For buy/sell: suggest mandi, FPOs, processors, pharma companies, exporters.
- If unsure, ask clarifying questions (crop, location, symptoms, acreage).
- Avoid brand promotion unless asked.

Guidelines:
- Give practical, step-by-step advice.
- Use simple language.

IMPORTANT:
- Always complete all phases.
- Do NOT stop mid-section.
- End with a short summary section titled: \"## Summary\".

Use Markdown headings and bullet points.
";

/// Build the system message for one exchange
pub fn system_prompt(location: &str, crop: Option<&str>) -> String {
    format!(
        "{}\nLocation: {}\nCrop (if provided): {}\n",
        INSTRUCTIONS,
        location,
        crop.unwrap_or(CROP_NOT_SPECIFIED)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_substitutes_location_and_crop() {
        let prompt = system_prompt("Kurukshetra, Haryana", Some("wheat"));
        assert!(prompt.contains("Location: Kurukshetra, Haryana\n"));
        assert!(prompt.contains("Crop (if provided): wheat\n"));
    }

    #[test]
    fn test_prompt_without_crop() {
        let prompt = system_prompt("India", None);
        assert!(prompt.contains("Crop (if provided): not specified"));
    }

    #[test]
    fn test_prompt_carries_format_rules() {
        let prompt = system_prompt("India", None);
        assert!(prompt.starts_with("You are a practical agriculture expert"));
        assert!(prompt.contains("Kharif/Rabi/Zaid"));
        assert!(prompt.contains("\"## Summary\""));
    }
}
