//! HTML for the single-page form.

use std::fmt::Write;

use crate::catalog::{AudioFormat, Language, Voice};
use crate::config::{SpeechSettings, SAMPLE_RATE_RANGE, SPEED_RANGE};

const HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>kokoro</title>
    <style>
        html {
            background-color: black;
            color: white;
            font-family: arial;
        }
        a, a:visited {
            color: white;
        }
        .error {
            color: #ff6b6b;
        }
    </style>
</head>
<body>
"#;

const TAIL: &str = "</body>\n</html>\n";

/// Everything the page shows for one request.
#[derive(Debug, Clone)]
pub struct Page<'a> {
    pub text: &'a str,
    pub settings: SpeechSettings,
    /// Download URL and format of the file just produced.
    pub audio: Option<(String, AudioFormat)>,
    pub error: Option<String>,
}

impl<'a> Page<'a> {
    pub fn new(settings: SpeechSettings) -> Self {
        Self {
            text: "",
            settings,
            audio: None,
            error: None,
        }
    }

    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut html = String::with_capacity(8 * 1024);
        html.push_str(HEAD);
        self.write_body(&mut html)?;
        html.push_str(TAIL);
        Ok(html)
    }

    fn write_body(&self, out: &mut String) -> std::fmt::Result {
        let s = &self.settings;

        if let Some(error) = &self.error {
            writeln!(out, "  <p class=\"error\">{}</p>", escape(error))?;
        }

        writeln!(out, "  <form method=\"post\" action=\"/\">")?;
        writeln!(
            out,
            "    <textarea name=\"text\" rows=\"6\" cols=\"60\" placeholder=\"Enter text here...\" required>{}</textarea><br>",
            escape(self.text)
        )?;

        writeln!(out, "    <label for=\"ext\">Format:</label>")?;
        writeln!(out, "    <select name=\"ext\" id=\"ext\">")?;
        for format in AudioFormat::ALL {
            option(out, format.extension(), &format.extension().to_uppercase(), *format == s.format)?;
        }
        writeln!(out, "    </select><br>")?;

        writeln!(out, "    <label for=\"voice\">Voice:</label>")?;
        writeln!(out, "    <select name=\"voice\" id=\"voice\">")?;
        for voice in Voice::ALL {
            option(out, voice.as_str(), voice.as_str(), *voice == s.voice)?;
        }
        writeln!(out, "    </select><br>")?;

        writeln!(out, "    <label for=\"language\">Language:</label>")?;
        writeln!(out, "    <select name=\"language\" id=\"language\">")?;
        option(out, "auto", "Match voice", s.language.is_none())?;
        for lang in Language::ALL {
            option(
                out,
                &lang.code().to_string(),
                lang.display_name(),
                s.language == Some(*lang),
            )?;
        }
        writeln!(out, "    </select><br>")?;

        writeln!(out, "    <label for=\"speed\">Speed:</label>")?;
        writeln!(
            out,
            "    <input type=\"number\" step=\"0.1\" min=\"{}\" max=\"{}\" name=\"speed\" id=\"speed\" value=\"{}\"><br>",
            SPEED_RANGE.start(),
            SPEED_RANGE.end(),
            s.speed
        )?;
        writeln!(out, "    <label for=\"sample_rate\">Sample Rate:</label>")?;
        writeln!(
            out,
            "    <input type=\"number\" min=\"{}\" max=\"{}\" name=\"sample_rate\" id=\"sample_rate\" value=\"{}\"><br>",
            SAMPLE_RATE_RANGE.start(),
            SAMPLE_RATE_RANGE.end(),
            s.sample_rate
        )?;
        writeln!(out, "    <button type=\"submit\">Create</button>")?;
        writeln!(out, "  </form>")?;

        if let Some((url, format)) = &self.audio {
            let url = escape(url);
            writeln!(out, "  <h2>Audio</h2>")?;
            writeln!(out, "  <audio controls>")?;
            writeln!(out, "    <source src=\"{url}\" type=\"{}\">", format.mime_type())?;
            writeln!(out, "    Your browser does not support the audio element.")?;
            writeln!(out, "  </audio>")?;
            writeln!(out, "  <p><a href=\"{url}\" download>Download Audio</a></p>")?;
        }
        Ok(())
    }
}

fn option(out: &mut String, value: &str, label: &str, selected: bool) -> std::fmt::Result {
    writeln!(
        out,
        "      <option value=\"{}\"{}>{}</option>",
        escape(value),
        if selected { " selected" } else { "" },
        escape(label)
    )
}

/// Minimal HTML escaping for text and attribute values.
pub fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
