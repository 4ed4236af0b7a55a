use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::catalog::{AudioFormat, Language, Voice};
use crate::config::{validate_sample_rate, validate_speed, SpeechSettings};
use crate::error::{Result, TtsError};
use crate::tts::validate_stem;
use crate::web::page::Page;
use crate::web::state::AppState;
use crate::SynthesisEngine;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

#[derive(Serialize)]
pub struct VoiceInfo {
    id: Voice,
    language: Language,
}

pub async fn voices() -> impl IntoResponse {
    let voices: Vec<VoiceInfo> = Voice::ALL
        .iter()
        .map(|&id| VoiceInfo {
            id,
            language: id.language(),
        })
        .collect();
    Json(voices)
}

/// Fields posted by the form. Empty values fall back to the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct SpeechForm {
    pub text: Option<String>,
    pub ext: Option<String>,
    pub voice: Option<String>,
    pub language: Option<String>,
    pub speed: Option<String>,
    pub sample_rate: Option<String>,
}

impl SpeechForm {
    /// Apply the submitted fields on top of `defaults`.
    pub fn settings(&self, defaults: &SpeechSettings) -> Result<SpeechSettings> {
        let mut settings = *defaults;

        if let Some(ext) = non_empty(&self.ext) {
            settings.format = ext.parse()?;
        }
        if let Some(voice) = non_empty(&self.voice) {
            settings.voice = voice.parse()?;
        }
        if let Some(language) = non_empty(&self.language) {
            settings.language = match language {
                "auto" => None,
                code => Some(code.parse()?),
            };
        }
        if let Some(speed) = non_empty(&self.speed) {
            let speed = speed
                .parse::<f32>()
                .map_err(|_| TtsError::invalid("speed", format!("{speed:?} is not a number")))?;
            settings.speed = validate_speed(speed)?;
        }
        if let Some(rate) = non_empty(&self.sample_rate) {
            let rate = rate.parse::<u32>().map_err(|_| {
                TtsError::invalid("sample rate", format!("{rate:?} is not a whole number"))
            })?;
            settings.sample_rate = validate_sample_rate(rate)?;
        }
        Ok(settings)
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub async fn index<E>(State(state): State<AppState<E>>) -> Response
where
    E: SynthesisEngine + Send + 'static,
{
    html_response(StatusCode::OK, &Page::new(*state.defaults()))
}

pub async fn create<E>(State(state): State<AppState<E>>, Form(form): Form<SpeechForm>) -> Response
where
    E: SynthesisEngine + Send + 'static,
{
    let text = form.text.clone().unwrap_or_default();

    let settings = match form.settings(state.defaults()) {
        Ok(settings) => settings,
        Err(e) => return error_page(&text, *state.defaults(), &e),
    };
    if text.trim().is_empty() {
        return error_page(&text, settings, &TtsError::EmptyText);
    }

    let worker_state = state.clone();
    let worker_text = text.clone();
    let result =
        tokio::task::spawn_blocking(move || worker_state.synthesize(&worker_text, &settings)).await;

    let path = match result {
        Ok(Ok(path)) => path,
        Ok(Err(e)) => return error_page(&text, settings, &e),
        Err(e) => {
            return error_page(
                &text,
                settings,
                &TtsError::Engine(format!("synthesis task failed: {e}")),
            )
        }
    };

    let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
        let e = TtsError::InvalidFilename(path.display().to_string());
        return error_page(&text, settings, &e);
    };
    log::info!("Serving {filename} ({} {})", settings.voice, settings.format);

    let page = Page {
        text: &text,
        settings,
        audio: Some((format!("/download/{filename}"), settings.format)),
        error: None,
    };
    html_response(StatusCode::OK, &page)
}

fn error_page(text: &str, settings: SpeechSettings, error: &TtsError) -> Response {
    let status = match error {
        TtsError::EmptyText => StatusCode::UNPROCESSABLE_ENTITY,
        e if e.is_validation() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        log::error!("Synthesis failed: {error}");
    } else {
        log::debug!("Rejected form submission: {error}");
    }

    let page = Page {
        text,
        settings,
        audio: None,
        error: Some(error.to_string()),
    };
    html_response(status, &page)
}

fn html_response(status: StatusCode, page: &Page<'_>) -> Response {
    match page.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            log::error!("Failed to render page: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Serve a generated file as an attachment. Range requests are answered by
/// [`ServeFile`], so the `<audio>` element can seek.
pub async fn download<E>(
    State(state): State<AppState<E>>,
    Path(filename): Path<String>,
    request: Request,
) -> Response
where
    E: SynthesisEngine + Send + 'static,
{
    if validate_stem(&filename).is_err() {
        return StatusCode::NOT_FOUND.into_response();
    }

    let path = state.output_dir().join(&filename);
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(AudioFormat::from_extension);

    let mut response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    };
    if !response.status().is_success() {
        return response;
    }

    let headers = response.headers_mut();
    if let Some(format) = format {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(format.mime_type()),
        );
    }
    match HeaderValue::from_str(&format!("attachment; filename=\"{filename}\"")) {
        Ok(value) => {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
        Err(e) => log::warn!("No Content-Disposition for {filename}: {e}"),
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TtsConfig;

    fn form(pairs: &[(&str, &str)]) -> SpeechForm {
        let mut form = SpeechForm::default();
        for &(key, value) in pairs {
            let value = Some(value.to_string());
            match key {
                "text" => form.text = value,
                "ext" => form.ext = value,
                "voice" => form.voice = value,
                "language" => form.language = value,
                "speed" => form.speed = value,
                "sample_rate" => form.sample_rate = value,
                _ => unreachable!(),
            }
        }
        form
    }

    #[test]
    fn empty_fields_keep_defaults() {
        let defaults = TtsConfig::default().settings();
        let settings = form(&[("ext", ""), ("speed", " ")]).settings(&defaults).unwrap();
        assert_eq!(settings, defaults);
    }

    #[test]
    fn fields_override_defaults() {
        let defaults = TtsConfig::default().settings();
        let settings = form(&[
            ("ext", "mp3"),
            ("voice", "BF_EMMA"),
            ("language", "b"),
            ("speed", "1.3"),
            ("sample_rate", "44100"),
        ])
        .settings(&defaults)
        .unwrap();
        assert_eq!(settings.format, AudioFormat::Mp3);
        assert_eq!(settings.voice, Voice::BfEmma);
        assert_eq!(settings.language, Some(Language::BritishEnglish));
        assert_eq!(settings.speed, 1.3);
        assert_eq!(settings.sample_rate, 44_100);

        let auto = form(&[("language", "auto")]).settings(&settings).unwrap();
        assert_eq!(auto.language, None);
    }

    #[test]
    fn bad_fields_are_validation_errors() {
        let defaults = TtsConfig::default().settings();
        for pairs in [
            [("voice", "nobody")],
            [("ext", "aiff")],
            [("speed", "fast")],
            [("speed", "9")],
            [("sample_rate", "-1")],
            [("sample_rate", "1000")],
            [("language", "zz")],
        ] {
            let err = form(&pairs).settings(&defaults).unwrap_err();
            assert!(err.is_validation(), "{pairs:?}: {err}");
        }
    }
}
