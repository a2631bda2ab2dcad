//! Static biographical record served by the API and used to ground the assistant

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const BUILTIN_PORTFOLIO: &str = include_str!("../assets/portfolio.toml");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Portfolio {
    pub name: String,
    pub title: String,
    pub location: String,
    pub email: String,
    pub phone: String,
    pub linkedin: String,
    pub summary: String,
    pub skills: Vec<String>,
    pub certifications: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    /// One-line introduction used by the assistant, e.g. "an IT professional with 7+ years of experience".
    /// Not part of the public record.
    #[serde(default, skip_serializing)]
    pub headline: Option<String>,
    /// Areas the fallback introduction lists; the first few skills when empty.
    /// Not part of the public record.
    #[serde(default, skip_serializing)]
    pub expertise: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperienceEntry {
    pub company: String,
    pub position: String,
    pub duration: String,
    pub location: String,
    pub highlights: Vec<String>,
}

impl Portfolio {
    /// The record compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_PORTFOLIO).context("Embedded portfolio record is invalid")
    }

    /// Load a replacement record from a TOML file with the same shape
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read portfolio file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse portfolio file: {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        let portfolio: Portfolio = toml::from_str(content)?;
        portfolio.check()?;
        Ok(portfolio)
    }

    fn check(&self) -> Result<()> {
        for (field, value) in [
            ("name", &self.name),
            ("title", &self.title),
            ("email", &self.email),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("Portfolio field '{}' must not be empty", field);
            }
        }
        Ok(())
    }

    /// System prompt that grounds the chat assistant in this record
    pub fn system_prompt(&self) -> String {
        let experience = self
            .experience
            .iter()
            .map(|exp| {
                format!(
                    "{} - {} ({}): {}",
                    exp.company,
                    exp.position,
                    exp.duration,
                    exp.highlights.join("; ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are an AI assistant representing {who}.

PROFILE INFORMATION:
Name: {name}
Title: {title}
Location: {location}
Email: {email}
Phone: {phone}
LinkedIn: {linkedin}

SUMMARY:
{summary}

KEY SKILLS:
{skills}

CERTIFICATIONS:
{certifications}

EXPERIENCE HIGHLIGHTS:
{experience}

INSTRUCTIONS:
1. When asked about {first}, provide accurate information from the profile above
2. Be professional yet friendly in tone
3. For general questions outside the profile, provide helpful information while maintaining professionalism
4. Always encourage connecting via LinkedIn or email for business inquiries
5. Provide concise, clear responses
6. If you don't know something, be honest about it
",
            who = self.introduction(),
            name = self.name,
            first = self.first_name(),
            title = self.title,
            location = self.location,
            email = self.email,
            phone = self.phone,
            linkedin = self.linkedin,
            summary = self.summary,
            skills = self.skills.join(", "),
            certifications = self.certifications.join(", "),
            experience = experience,
        )
    }

    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }

    /// "Name, headline", or "Name (title)" when the record has no headline
    pub fn introduction(&self) -> String {
        match self.headline.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
            Some(headline) => format!("{}, {}", self.name, headline),
            None => format!("{} ({})", self.name, self.title),
        }
    }

    /// Areas of expertise to highlight, at most `limit`
    pub fn expertise(&self, limit: usize) -> Vec<&str> {
        let areas = if self.expertise.is_empty() {
            &self.skills
        } else {
            &self.expertise
        };
        areas.iter().take(limit).map(String::as_str).collect()
    }
}
