//! Speech-to-text client and orchestrator against a mock HTTP service.

use std::sync::{Arc, Mutex};

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use castforge::transcribe::UploadKind;
use castforge::{
    encode_wav, CompressionPass, CompressionSettings, HttpSpeechToText, MediaError, PcmBuffer,
    ServiceConfig, SourceMedia, SpeechToText, Transcriber, TranscriptionState,
};

fn service(server: &MockServer) -> Arc<HttpSpeechToText> {
    let config = ServiceConfig {
        endpoint: format!("{}/v1/audio/transcriptions", server.uri()),
        timeout_secs: 10,
        ..ServiceConfig::default()
    };
    Arc::new(HttpSpeechToText::with_api_key(config, Some("test-key".to_string())).unwrap())
}

/// Byte-level body match; multipart bodies carrying audio are not UTF-8.
fn body_has(needle: &'static str) -> impl Fn(&Request) -> bool + Send + Sync {
    move |request: &Request| {
        request
            .body
            .windows(needle.len())
            .any(|w| w == needle.as_bytes())
    }
}

fn speech_wav() -> SourceMedia {
    let samples = (0..16_000).map(|i| (i as f32 * 0.02).sin() * 0.4).collect();
    let buffer = PcmBuffer::mono(16_000, samples).unwrap();
    SourceMedia::new(encode_wav(&buffer).unwrap().into_bytes(), "memo.wav")
}

#[tokio::test]
async fn uploads_original_and_returns_trimmed_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_has("whisper-1"))
        .and(body_has("filename=\"memo.wav\""))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "text": "  hello world \n" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transcriber = Transcriber::new(service(&server), CompressionSettings::default());
    let outcome = transcriber.transcribe(&speech_wav()).await.unwrap();

    assert_eq!(outcome.text, "hello world");
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.upload, UploadKind::Original);
}

#[tokio::test]
async fn upload_is_sent_verbatim_with_content_length() {
    const AUDIO: &[u8] = b"RIFF\x00\xff\xfe\x80WAVEdata";
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(|request: &Request| {
            let declared = request
                .headers
                .get("content-length")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<usize>().ok());
            declared == Some(request.body.len())
                && request.body.windows(AUDIO.len()).any(|w| w == AUDIO)
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "text": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let upload = castforge::transcribe::AudioUpload::new(
        bytes::Bytes::from_static(AUDIO),
        "raw.wav",
        "audio/wav",
    );
    let text = service(&server).transcribe(&upload).await.unwrap();
    assert_eq!(text, "ok");
}

#[tokio::test]
async fn payload_too_large_maps_to_typed_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(413).set_body_string("Maximum content size exceeded"))
        .mount(&server)
        .await;

    let upload = castforge::transcribe::AudioUpload::new(
        bytes::Bytes::from_static(b"RIFF"),
        "a.wav",
        "audio/wav",
    );
    let client = service(&server);
    let err = client.transcribe(&upload).await.unwrap_err();

    assert!(err.is_payload_too_large());
    assert!(err.to_string().contains("Maximum content size exceeded"));
}

#[tokio::test]
async fn server_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model overloaded"))
        .expect(1)
        .mount(&server)
        .await;

    let transcriber = Transcriber::new(service(&server), CompressionSettings::default());
    let err = transcriber.transcribe(&speech_wav()).await.unwrap_err();

    match err {
        MediaError::Service(msg) => {
            assert!(msg.contains("500"));
            assert!(msg.contains("model overloaded"));
        }
        other => panic!("expected service error, got {other:?}"),
    }
}

#[tokio::test]
async fn blank_transcript_is_no_speech() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "text": "   " })))
        .mount(&server)
        .await;

    let transcriber = Transcriber::new(service(&server), CompressionSettings::default());
    let err = transcriber.transcribe(&speech_wav()).await.unwrap_err();
    assert!(matches!(err, MediaError::NoSpeechDetected));
}

#[tokio::test]
async fn size_rejection_escalates_once_to_ultra() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(413))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "text": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let states = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&states);
    let transcriber = Transcriber::new(service(&server), CompressionSettings::default())
        .with_observer(Arc::new(move |s: TranscriptionState| seen.lock().unwrap().push(s)));

    let source = speech_wav();
    let outcome = transcriber.transcribe(&source).await.unwrap();

    assert_eq!(outcome.text, "ok");
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.upload, UploadKind::Compressed(CompressionPass::Ultra));
    // 16 kHz → 8 kHz halves the payload
    assert!(outcome.uploaded_bytes < source.len());
    assert!(states.lock().unwrap().contains(&TranscriptionState::Escalating));
}

#[tokio::test]
async fn second_size_rejection_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(413).set_body_string("too big"))
        .expect(2)
        .mount(&server)
        .await;

    let transcriber = Transcriber::new(service(&server), CompressionSettings::default());
    let err = transcriber.transcribe(&speech_wav()).await.unwrap_err();
    assert!(err.is_payload_too_large());
}
