//! Canned replies used when the assistant answers without the upstream model

use crate::portfolio::Portfolio;

/// Messages answered locally instead of going upstream
pub const GREETINGS: &[&str] = &["hi", "hello", "hey", "yo", "hola", "howdy"];

/// Keywords that switch the fallback to the career overview
pub const OVERVIEW_KEYWORDS: &[&str] = &["experience", "background", "cv", "resume"];

/// Closing boilerplate cut from assistant text, matched case-insensitively.
/// `boilerplate_phrases` adds the one that names the portfolio owner.
const BOILERPLATE_PHRASES: &[&str] = &[
    "If you'd like insights",
    "If you'd like any insights",
    "For IT inquiries",
    "For professional inquiries",
    "Feel free to ask about his",
    "You can connect via",
];

pub fn boilerplate_phrases(portfolio: &Portfolio) -> Vec<String> {
    std::iter::once(format!(
        "Is there anything specific about {}",
        portfolio.first_name()
    ))
    .chain(BOILERPLATE_PHRASES.iter().map(|p| p.to_string()))
    .collect()
}

pub fn greeting(portfolio: &Portfolio) -> String {
    format!(
        "👋 Hey there! I'm {}'s AI assistant. I can share their experience, skills, certifications, projects, or help connect you with them. What would you like to know?",
        portfolio.first_name()
    )
}

/// Career overview built from the experience entries
pub fn overview(portfolio: &Portfolio) -> String {
    let positions = portfolio
        .experience
        .iter()
        .map(|exp| {
            let company = exp.company.trim_end_matches(" Plc");
            match year_span(&exp.duration) {
                Some(years) => format!("- {} at {} ({})", exp.position, company, years),
                None => format!("- {} at {}", exp.position, company),
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let competencies = portfolio
        .skills
        .iter()
        .take(5)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" • ");

    format!(
        "Here's an overview of {name}'s professional background:\n\n\
         📊 **Professional Summary**: {summary}\n\n\
         🏢 **Key Positions**:\n{positions}\n\n\
         🎯 **Core Competencies**:\n{competencies} and more\n\n\
         📧 Contact: {email} | 📱 {phone}",
        name = portfolio.name,
        summary = summary_line(portfolio),
        positions = positions,
        competencies = competencies,
        email = portfolio.email,
        phone = portfolio.phone,
    )
}

pub fn introduction(portfolio: &Portfolio) -> String {
    let areas = portfolio
        .expertise(5)
        .iter()
        .map(|area| format!("• {}", area))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Hello! I'm {first}'s AI assistant. While the AI service is reconnecting, here's a quick profile:\n\n\
         {who}.\n\n\
         **Key Areas of Expertise:**\n{areas}\n\n\
         **Contact:** {email}",
        first = portfolio.first_name(),
        who = portfolio.introduction(),
        areas = areas,
        email = portfolio.email,
    )
}

/// The record's summary, or its title when the summary is blank
fn summary_line(portfolio: &Portfolio) -> &str {
    match portfolio.summary.trim() {
        "" => portfolio.title.trim(),
        summary => summary,
    }
}

/// "September 2022 - May 2024 (1 year 9 months)" -> "2022-2024"
fn year_span(duration: &str) -> Option<String> {
    let years: Vec<&str> = duration
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| part.len() == 4)
        .collect();

    match (years.first(), years.last()) {
        (Some(first), Some(last)) if first == last => Some(first.to_string()),
        (Some(first), Some(last)) => Some(format!("{}-{}", first, last)),
        _ => None,
    }
}
