//! History behaves like a simple list-and-cursor model under any sequence
//! of operations.

use gemlet_document::{Document, ResponseParser};
use gemlet_navigation::HistoryStack;
use proptest::prelude::*;
use url::Url;

#[derive(Debug, Clone)]
enum Op {
    Add(u8),
    Back,
    Forward,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..8).prop_map(Op::Add),
        Just(Op::Back),
        Just(Op::Forward),
    ]
}

fn page(n: u8) -> Document {
    let url = Url::parse(&format!("gemini://example.org/{n}")).unwrap();
    ResponseParser::parse_bytes(url, b"20 text/gemini\r\n").unwrap()
}

proptest! {
    #[test]
    fn matches_model(ops in prop::collection::vec(op(), 0..64)) {
        let mut history = HistoryStack::new();
        let mut model: Vec<u8> = Vec::new();
        let mut cursor = 0usize;

        for op in ops {
            match op {
                Op::Add(n) => {
                    if !model.is_empty() {
                        model.truncate(cursor + 1);
                    }
                    model.push(n);
                    cursor = model.len() - 1;
                    history.add(page(n));
                }
                Op::Back => {
                    let moved = history.back().is_some();
                    prop_assert_eq!(moved, cursor > 0);
                    if moved {
                        cursor -= 1;
                    }
                }
                Op::Forward => {
                    let moved = history.forward().is_some();
                    prop_assert_eq!(moved, cursor + 1 < model.len());
                    if moved {
                        cursor += 1;
                    }
                }
            }

            prop_assert_eq!(history.len(), model.len());
            if !model.is_empty() {
                prop_assert!(history.cursor() < history.len());
                prop_assert_eq!(history.cursor(), cursor);
                let current = history.current().unwrap().url().path().to_string();
                prop_assert_eq!(current, format!("/{}", model[cursor]));
            }
        }
    }
}
