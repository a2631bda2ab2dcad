use serde::Deserialize;

/// Contact form as posted by the SPA. Every field is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A validated submission, ready to forward
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ContactError {
    #[error("All fields are required")]
    MissingFields,
    #[error("Invalid email address")]
    InvalidEmail,
}

impl ContactForm {
    pub fn validate(self) -> Result<ContactMessage, ContactError> {
        fn required(field: Option<String>) -> Result<String, ContactError> {
            field
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ContactError::MissingFields)
        }

        let message = ContactMessage {
            name: required(self.name)?,
            email: required(self.email)?,
            subject: required(self.subject)?,
            message: required(self.message)?,
        };

        if !is_valid_email(&message.email) || message.email.parse::<lettre::Address>().is_err() {
            return Err(ContactError::InvalidEmail);
        }

        Ok(message)
    }
}

/// `local@domain.tld`: no whitespace, exactly one '@', and a dot inside the domain
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

impl ContactMessage {
    /// Subject line of the forwarded email, folded onto one line
    pub fn mail_subject(&self) -> String {
        let subject = self.subject.replace(['\r', '\n'], " ");
        format!("Portfolio Contact: {}", subject)
    }

    pub fn html_body(&self) -> String {
        format!(
            "<h2>New Contact Form Submission</h2>\n\
             <p><strong>Name:</strong> {}</p>\n\
             <p><strong>Email:</strong> {}</p>\n\
             <p><strong>Subject:</strong> {}</p>\n\
             <p><strong>Message:</strong></p>\n\
             <p>{}</p>\n",
            escape_html(&self.name),
            escape_html(&self.email),
            escape_html(&self.subject),
            escape_html(&self.message).replace('\n', "<br>"),
        )
    }
}

/// Escape HTML special characters
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}
