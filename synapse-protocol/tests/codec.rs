use proptest::prelude::*;
use synapse_protocol::*;

#[test]
fn model_may_not_emit_observations_or_errors() {
    let codec = TextCodec::new();
    let ops = codec.decode_reply("OBS: 42<END>ERR: oops<END>FOO: bar<END>");
    assert_eq!(ops, vec![Operation::error(INVALID_CODE); 3]);
}

#[test]
fn symmetric_decode_keeps_engine_codes() {
    let codec = TextCodec::new();
    let ops = codec.decode("OBS: 42<END>ERR: tool failed<END>");
    assert_eq!(
        ops,
        vec![
            Operation::Observation {
                content: "42".into(),
                tool: None
            },
            Operation::error("tool failed"),
        ]
    );
}

#[test]
fn malformed_action_becomes_format_error() {
    let codec = TextCodec::new();
    let ops = codec.decode_reply("ACT: search for cats<END>");
    assert_eq!(ops, vec![Operation::error(INVALID_ACTION)]);
}

#[test]
fn unparsed_reply_is_implicit_thought_by_default() {
    let codec = TextCodec::new();
    let ops = codec.decode_reply("I am not sure what to do.");
    assert_eq!(ops, vec![Operation::Thought("I am not sure what to do.".into())]);
}

#[test]
fn unparsed_reply_can_be_a_format_error() {
    let codec = TextCodec::with_policy(UnparsedReplyPolicy::FormatError);
    assert_eq!(codec.policy(), UnparsedReplyPolicy::FormatError);
    let ops = codec.decode_reply("I am not sure what to do.");
    assert_eq!(ops, vec![Operation::error(NO_MATCH)]);
}

#[test]
fn operations_are_decoded_in_order() {
    let codec = TextCodec::new();
    let reply = "THT: I need the length<END>\nACT: len(\"hello\")<END>\nTHT: wait<END>";
    let codes: Vec<_> = codec.decode_reply(reply).iter().map(Operation::code).collect();
    assert_eq!(codes, vec![OpCode::Thought, OpCode::Action, OpCode::Thought]);
}

#[test]
fn multiline_answer_survives_strict_decoding() {
    let codec = TextCodec::new();
    let ops = codec.decode_reply("ANS: {\n  \"total\": 3\n}<END>");
    assert_eq!(ops, vec![Operation::Answer("{\n  \"total\": 3\n}".into())]);
}

#[test]
fn codes_start_at_a_word_boundary() {
    let codec = TextCodec::new();
    let ops = codec.decode_reply("FINAL ANSWER: ANS: 42<END>");
    assert_eq!(ops, vec![Operation::Answer("42".into())]);
}

#[test]
fn unterminated_tail_after_last_end_is_still_decoded() {
    let codec = TextCodec::new();
    let ops = codec.decode_reply("THT: done<END>\nACT: echo({\"text\": \"hi\"})\n");
    assert_eq!(
        ops,
        vec![
            Operation::Thought("done".into()),
            Operation::Action {
                tool: "echo".into(),
                args: "{\"text\": \"hi\"}".into()
            },
        ]
    );
}

#[test]
fn trailing_chatter_without_a_code_is_ignored() {
    let codec = TextCodec::new();
    let ops = codec.decode_reply("ANS: 42<END>\nHope this helps!");
    assert_eq!(ops, vec![Operation::Answer("42".into())]);
}

// ---- Round-trip law ----

fn content() -> impl Strategy<Value = String> {
    "[^<]{0,40}"
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        content().prop_map(Operation::Thought),
        content().prop_map(Operation::Answer),
        ("[a-z_][a-z0-9_]{0,12}", content())
            .prop_map(|(tool, args)| Operation::Action { tool, args }),
        content().prop_map(|content| Operation::Observation {
            content,
            tool: None
        }),
        content().prop_map(|content| Operation::Error {
            content,
            tool: None
        }),
    ]
}

proptest! {
    #[test]
    fn decode_inverts_encode(op in operation()) {
        let codec = TextCodec::new();
        let decoded = codec.decode(&codec.encode(&op));
        prop_assert_eq!(decoded, vec![op]);
    }

    #[test]
    fn decode_inverts_encode_for_sequences(ops in prop::collection::vec(operation(), 1..6)) {
        let codec = TextCodec::new();
        let wire: String = ops.iter().map(|op| codec.encode(op)).collect::<Vec<_>>().join("\n");
        prop_assert_eq!(codec.decode(&wire), ops);
    }
}
