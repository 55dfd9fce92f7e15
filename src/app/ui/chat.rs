use eframe::egui::{self, Context, Key, RichText, Ui};

use crate::assistant::{CANCELLED_MESSAGE, StreamEvent, spawn_chat};

use super::super::{ChatState, ChatTurn, ViewModel};

impl ChatState {
    fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    fn apply(&mut self, event: StreamEvent) {
        let Some(turn) = self.turns.last_mut() else {
            return;
        };
        match event {
            StreamEvent::Init { provider, model } => {
                self.provider_label = Some(format!("{provider} / {model}"));
            }
            StreamEvent::Content { content } => turn.answer.push_str(&content),
            StreamEvent::Done => turn.done = true,
            StreamEvent::Error { message } => {
                turn.error = Some(message);
                turn.done = true;
            }
        }
    }

    /// Folds pending events into the last turn. Returns true while a reply is open.
    fn poll(&mut self) -> bool {
        let Some(handle) = self.active.as_mut() else {
            return false;
        };
        let events = handle.drain();
        let finished = handle.is_finished();
        for event in events {
            self.apply(event);
        }
        if finished {
            self.active = None;
        }
        !finished
    }

    /// Ends the open reply at once; the worker notices on its next send or read.
    fn cancel(&mut self) {
        let Some(handle) = self.active.take() else {
            return;
        };
        handle.cancel();
        self.apply(StreamEvent::error(CANCELLED_MESSAGE));
        log::info!("assistant reply cancelled");
    }
}

impl ViewModel {
    pub(in crate::app) fn poll_chat(&mut self, ctx: &Context) {
        if self.chat.poll() {
            ctx.request_repaint();
        }
    }

    fn send_question(&mut self) {
        let question = self.chat.input.trim().to_owned();
        if question.is_empty() || self.chat.is_busy() {
            return;
        }
        self.chat.input.clear();
        self.chat.turns.push(ChatTurn {
            question: question.clone(),
            answer: String::new(),
            error: None,
            done: false,
        });
        self.chat.active = Some(spawn_chat(
            self.assistant_config.clone(),
            Some(self.summary.clone()),
            question,
        ));
    }

    pub(in crate::app) fn draw_chat(&mut self, ui: &mut Ui) {
        ui.heading("Ask about this graph");
        if let Some(label) = &self.chat.provider_label {
            ui.small(label.as_str());
        }
        ui.add_space(4.0);

        for turn in &self.chat.turns {
            ui.label(RichText::new(turn.question.as_str()).strong());
            if turn.answer.is_empty() && !turn.done {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("waiting for reply");
                });
            } else if !turn.answer.is_empty() {
                ui.label(turn.answer.as_str());
            }
            if let Some(error) = &turn.error {
                ui.colored_label(egui::Color32::from_rgb(230, 110, 110), error.as_str());
            }
            ui.add_space(6.0);
        }

        let busy = self.chat.is_busy();
        let input = ui.add_enabled(
            !busy,
            egui::TextEdit::multiline(&mut self.chat.input)
                .desired_rows(2)
                .hint_text("e.g. Which space hosts the most events?"),
        );
        let submitted = input.has_focus()
            && ui.input(|input| input.key_pressed(Key::Enter) && input.modifiers.command);

        ui.horizontal(|ui| {
            let can_send = !busy && !self.chat.input.trim().is_empty();
            if ui.add_enabled(can_send, egui::Button::new("Send")).clicked() || submitted {
                self.send_question();
            }
            if ui.add_enabled(busy, egui::Button::new("Cancel")).clicked() {
                self.chat.cancel();
            }
            if ui
                .add_enabled(!busy && !self.chat.turns.is_empty(), egui::Button::new("Clear"))
                .clicked()
            {
                self.chat.turns.clear();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::ChatHandle;

    fn state_with_turn() -> ChatState {
        ChatState {
            turns: vec![ChatTurn {
                question: "busiest space?".to_owned(),
                answer: String::new(),
                error: None,
                done: false,
            }],
            ..ChatState::default()
        }
    }

    #[test]
    fn content_accumulates_until_done() {
        let mut state = state_with_turn();
        state.apply(StreamEvent::Init {
            provider: "deepseek".to_owned(),
            model: "deepseek-chat".to_owned(),
        });
        state.apply(StreamEvent::Content {
            content: "The ".to_owned(),
        });
        state.apply(StreamEvent::Content {
            content: "hall.".to_owned(),
        });
        state.apply(StreamEvent::Done);

        let turn = &state.turns[0];
        assert_eq!(turn.answer, "The hall.");
        assert!(turn.done);
        assert!(turn.error.is_none());
        assert_eq!(state.provider_label.as_deref(), Some("deepseek / deepseek-chat"));
    }

    #[test]
    fn error_finishes_the_turn() {
        let mut state = state_with_turn();
        state.apply(StreamEvent::Error {
            message: "no key".to_owned(),
        });
        assert!(state.turns[0].done);
        assert_eq!(state.turns[0].error.as_deref(), Some("no key"));
    }

    #[test]
    fn cancel_frees_a_reply_that_never_answers() {
        let mut state = state_with_turn();
        let (tx, handle) = ChatHandle::detached();
        state.active = Some(handle);
        assert!(state.poll());
        assert!(state.is_busy());

        state.cancel();
        assert!(!state.is_busy());
        assert!(!state.poll());
        assert!(state.turns[0].done);
        assert_eq!(state.turns[0].error.as_deref(), Some(CANCELLED_MESSAGE));
        assert!(tx.send(StreamEvent::Done).is_err());
    }

    #[test]
    fn poll_without_a_reply_is_idle() {
        let mut state = ChatState::default();
        assert!(!state.poll());
        state.apply(StreamEvent::Done);
        assert!(state.turns.is_empty());
    }
}
