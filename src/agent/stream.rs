//! Event stream translator
//!
//! Turns state-machine events into the typed frames a caller consumes:
//!
//! ```text
//! {"type":"meta","thread_id":"..."}      new threads only, before generation
//! {"type":"processing","text":"..."}     tool start / finish
//! {"type":"delta","text":"..."}          chat and summarize output only
//! {"type":"meta","history_id":N}         after the answer is persisted
//! {"type":"error","code":"...","text":"..."}
//! [DONE]                                 always, exactly once, last
//! ```

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::error::{BridgeError, ErrorKind, Result};

use super::events::{GraphEvent, Stage};

/// Progress text shown while a tool runs.
pub const TOOL_STARTED_TEXT: &str = "Querying data";
/// Progress text shown after a tool returns.
pub const TOOL_FINISHED_TEXT: &str = "Checking results";
/// Delta text sent when a model or tool call fails.
pub const APOLOGY_TEXT: &str = "\n\n[system] The service hit an error, please try again later.";

/// One frame of the output protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    ThreadMeta { thread_id: String },
    Delta { text: String },
    Processing { text: String },
    HistoryMeta { history_id: i64 },
    Error { code: String, text: String },
    Done,
}

impl Frame {
    /// JSON body of the frame; `None` for the terminal marker.
    pub fn to_json(&self) -> Option<Value> {
        let value = match self {
            Frame::ThreadMeta { thread_id } => json!({"type": "meta", "thread_id": thread_id}),
            Frame::Delta { text } => json!({"type": "delta", "text": text}),
            Frame::Processing { text } => json!({"type": "processing", "text": text}),
            Frame::HistoryMeta { history_id } => json!({"type": "meta", "history_id": history_id}),
            Frame::Error { code, text } => json!({"type": "error", "code": code, "text": text}),
            Frame::Done => return None,
        };
        Some(value)
    }

    /// Server-sent-events wire form.
    ///
    /// # Example
    /// ```
    /// use querybridge::agent::Frame;
    ///
    /// assert_eq!(Frame::Done.to_sse(), "data: [DONE]\n\n");
    /// let delta = Frame::Delta { text: "hi".into() };
    /// assert_eq!(delta.to_sse(), "data: {\"text\":\"hi\",\"type\":\"delta\"}\n\n");
    /// ```
    pub fn to_sse(&self) -> String {
        match self.to_json() {
            Some(value) => format!("data: {}\n\n", value),
            None => "data: [DONE]\n\n".to_string(),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Frame::Done)
    }
}

/// Writes frames for one user turn.
///
/// Owns the output channel; [`close`](Self::close) sends the terminal frame.
pub struct EventStreamTranslator {
    out: mpsc::Sender<Frame>,
    answer: String,
    closed: bool,
}

impl EventStreamTranslator {
    pub fn new(out: mpsc::Sender<Frame>) -> Self {
        Self {
            out,
            answer: String::new(),
            closed: false,
        }
    }

    /// Announce the thread id when the turn created the thread.
    pub async fn open(&mut self, thread_id: &str, is_new: bool) -> Result<()> {
        if is_new {
            self.send(Frame::ThreadMeta {
                thread_id: thread_id.to_string(),
            })
            .await?;
        }
        Ok(())
    }

    /// Translate events until the state machine drops its sink.
    ///
    /// Returns `Cancelled` as soon as the caller stops listening; dropping
    /// `events` then stops the state machine too.
    pub async fn pump(&mut self, mut events: mpsc::Receiver<GraphEvent>) -> Result<()> {
        loop {
            let event = tokio::select! {
                event = events.recv() => event,
                _ = self.out.closed() => return Err(BridgeError::Cancelled),
            };
            match event {
                Some(event) => self.translate(event).await?,
                None => return Ok(()),
            }
        }
    }

    async fn translate(&mut self, event: GraphEvent) -> Result<()> {
        match event {
            GraphEvent::Delta { stage, text } => {
                if matches!(stage, Stage::Chat | Stage::Summarize) && !text.is_empty() {
                    self.answer.push_str(&text);
                    self.send(Frame::Delta { text }).await?;
                }
            }
            GraphEvent::ToolStarted { name, .. } => {
                debug!(tool = %name, "Tool started");
                self.send(Frame::Processing {
                    text: TOOL_STARTED_TEXT.to_string(),
                })
                .await?;
            }
            GraphEvent::ToolFinished { name, is_error, .. } => {
                debug!(tool = %name, is_error, "Tool finished");
                self.send(Frame::Processing {
                    text: TOOL_FINISHED_TEXT.to_string(),
                })
                .await?;
            }
            GraphEvent::StageEntered(stage) => debug!(stage = %stage, "Stage entered"),
        }
        Ok(())
    }

    /// Answer text streamed to the caller so far.
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Report the stored history record.
    pub async fn persisted(&mut self, history_id: i64) -> Result<()> {
        self.send(Frame::HistoryMeta { history_id }).await
    }

    /// Report a failed turn according to its error kind.
    pub async fn fail(&mut self, err: &BridgeError) -> Result<()> {
        match err.kind() {
            ErrorKind::IterationExhausted => {
                self.send(Frame::Error {
                    code: "iteration_exhausted".to_string(),
                    text: err.to_string(),
                })
                .await
            }
            ErrorKind::Cancelled => Ok(()),
            ErrorKind::Upstream => {
                error!(error = %err, "Turn failed");
                self.send(Frame::Delta {
                    text: APOLOGY_TEXT.to_string(),
                })
                .await
            }
        }
    }

    /// Send the terminal frame. Later calls do nothing.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        // A departed caller needs no terminator.
        let _ = self.out.send(Frame::Done).await;
    }

    async fn send(&self, frame: Frame) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.out.send(frame).await.map_err(|_| BridgeError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::Receiver<Frame>) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_frame_json_shapes() {
        let meta = Frame::ThreadMeta {
            thread_id: "t1".into(),
        };
        assert_eq!(meta.to_json(), Some(json!({"type": "meta", "thread_id": "t1"})));
        assert_eq!(
            Frame::HistoryMeta { history_id: 7 }.to_json(),
            Some(json!({"type": "meta", "history_id": 7}))
        );
        assert_eq!(Frame::Done.to_json(), None);
        assert!(Frame::Done.is_done());
    }

    #[tokio::test]
    async fn test_only_answer_stages_produce_deltas() {
        let (out, mut rx) = mpsc::channel(16);
        let (tx, events) = mpsc::channel(16);
        let mut translator = EventStreamTranslator::new(out);

        for event in [
            GraphEvent::StageEntered(Stage::Agent),
            GraphEvent::Delta {
                stage: Stage::Agent,
                text: "draft".into(),
            },
            GraphEvent::ToolStarted {
                name: "query_database".into(),
                call_id: "1".into(),
            },
            GraphEvent::ToolFinished {
                name: "query_database".into(),
                call_id: "1".into(),
                is_error: false,
            },
            GraphEvent::Delta {
                stage: Stage::Summarize,
                text: "Twelve ".into(),
            },
            GraphEvent::Delta {
                stage: Stage::Summarize,
                text: "rooms.".into(),
            },
        ] {
            tx.send(event).await.unwrap();
        }
        drop(tx);

        translator.pump(events).await.unwrap();
        translator.close().await;

        assert_eq!(
            drain(&mut rx),
            vec![
                Frame::Processing {
                    text: TOOL_STARTED_TEXT.into()
                },
                Frame::Processing {
                    text: TOOL_FINISHED_TEXT.into()
                },
                Frame::Delta {
                    text: "Twelve ".into()
                },
                Frame::Delta {
                    text: "rooms.".into()
                },
                Frame::Done,
            ]
        );
        assert_eq!(translator.answer(), "Twelve rooms.");
    }

    #[tokio::test]
    async fn test_open_only_announces_new_threads() {
        let (out, mut rx) = mpsc::channel(4);
        let mut translator = EventStreamTranslator::new(out);
        translator.open("old", false).await.unwrap();
        translator.open("fresh", true).await.unwrap();
        assert_eq!(
            drain(&mut rx),
            vec![Frame::ThreadMeta {
                thread_id: "fresh".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_fail_frames_and_single_done() {
        let (out, mut rx) = mpsc::channel(8);
        let mut translator = EventStreamTranslator::new(out);

        translator
            .fail(&BridgeError::IterationExhausted { steps: 51, limit: 50 })
            .await
            .unwrap();
        translator
            .fail(&BridgeError::Provider("502".into()))
            .await
            .unwrap();
        translator.fail(&BridgeError::Cancelled).await.unwrap();
        translator.close().await;
        translator.close().await;
        translator.persisted(3).await.unwrap();

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 3);
        assert!(matches!(&frames[0], Frame::Error { code, .. } if code == "iteration_exhausted"));
        assert_eq!(
            frames[1],
            Frame::Delta {
                text: APOLOGY_TEXT.into()
            }
        );
        assert_eq!(frames[2], Frame::Done);
    }

    #[tokio::test]
    async fn test_pump_cancelled_when_caller_leaves() {
        let (out, rx) = mpsc::channel(1);
        let (_tx, events) = mpsc::channel::<GraphEvent>(1);
        let mut translator = EventStreamTranslator::new(out);
        drop(rx);

        let err = translator.pump(events).await.unwrap_err();
        assert!(matches!(err, BridgeError::Cancelled));
    }
}
