//! Property tests for the streaming binary editor.

use nativejar::editor::StreamEditor;
use nativejar::Error;
use proptest::prelude::*;

const S: u8 = b'X';

fn edit(editor: &StreamEditor, input: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    editor.edit(input, &mut out).unwrap();
    out
}

fn longest_run(input: &[u8]) -> usize {
    input
        .split(|&b| b != S)
        .map(|run| run.len())
        .max()
        .unwrap_or(0)
}

/// Bytes drawn mostly from a small alphabet that includes the sentinel.
fn bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop_oneof![Just(S), Just(b'a'), Just(0u8), any::<u8>()], 0..200)
}

proptest! {
    #[test]
    fn identity_without_qualifying_run(input in bytes(), n in 1usize..16) {
        prop_assume!(longest_run(&input) < n);
        let editor = StreamEditor::new(S, n, vec![b'r'; n.min(3)]).unwrap();
        prop_assert_eq!(edit(&editor, &input), input);
    }

    #[test]
    fn length_is_always_preserved(input in bytes(), n in 1usize..16, r in 0usize..16) {
        prop_assume!(r <= n);
        let editor = StreamEditor::new(S, n, vec![b'r'; r]).unwrap();
        prop_assert_eq!(edit(&editor, &input).len(), input.len());
    }

    #[test]
    fn single_slot_decodes_to_replacement(
        prefix in prop::collection::vec(b'a'..b'w', 0..50),
        suffix in prop::collection::vec(b'a'..b'w', 0..50),
        n in 1usize..32,
        replacement in prop::collection::vec(b'0'..b'9', 0..32),
    ) {
        prop_assume!(replacement.len() <= n);
        let mut input = prefix.clone();
        input.extend(std::iter::repeat(S).take(n));
        input.extend_from_slice(&suffix);

        let editor = StreamEditor::new(S, n, replacement.clone()).unwrap();
        let out = edit(&editor, &input);

        let slot = &out[prefix.len()..prefix.len() + n];
        prop_assert_eq!(&slot[..replacement.len()], replacement.as_slice());
        prop_assert!(slot[replacement.len()..].iter().all(|&b| b == S));
        prop_assert_eq!(&out[..prefix.len()], prefix.as_slice());
        prop_assert_eq!(&out[prefix.len() + n..], suffix.as_slice());
    }

    #[test]
    fn second_run_is_untouched(n in 1usize..16, gap in 1usize..8) {
        let mut input = vec![S; n];
        input.extend(std::iter::repeat(b'-').take(gap));
        input.extend(std::iter::repeat(S).take(n));

        let editor = StreamEditor::new(S, n, vec![b'Q'; n]).unwrap();
        let out = edit(&editor, &input);

        prop_assert!(out[..n].iter().all(|&b| b == b'Q'));
        prop_assert_eq!(&out[n..], &input[n..]);
    }

    #[test]
    fn oversized_replacement_is_rejected(n in 1usize..64, extra in 1usize..8) {
        let result = StreamEditor::new(S, n, vec![0u8; n + extra]);
        prop_assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }
}

/// Reads one byte per call and panics if read again after EOF.
struct Trickle<'a> {
    data: &'a [u8],
    done: bool,
}

impl std::io::Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        assert!(!self.done, "read after end of input");
        match self.data.split_first() {
            Some((&b, rest)) if !buf.is_empty() => {
                buf[0] = b;
                self.data = rest;
                Ok(1)
            }
            _ => {
                self.done = true;
                Ok(0)
            }
        }
    }
}

#[test]
fn test_forward_only_reader() {
    let mut template = vec![7u8; 10_000];
    template[100..356].fill(S);
    let replacement: Vec<u8> = (b'a'..b'a' + 20).collect();
    let editor = StreamEditor::new(S, 256, replacement.clone()).unwrap();

    let mut out = Vec::new();
    let summary = editor
        .edit(Trickle { data: &template, done: false }, &mut out)
        .unwrap();

    assert_eq!(out.len(), 10_000);
    assert_eq!(summary.bytes, 10_000);
    assert_eq!(&out[100..120], replacement.as_slice());
    assert!(out[120..356].iter().all(|&b| b == S));
    assert!(out[356..].iter().all(|&b| b == 7));
}
