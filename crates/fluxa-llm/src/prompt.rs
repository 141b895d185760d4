//! Prompt text for both generation strategies.

use crate::chat::ChatMessage;
use serde_json::json;

pub const SYSTEM_PROMPT: &str = r#"You convert Photoshop tutorial instructions into Photoshop API ActionJSON.

The actions run against a document that the API has already loaded. There is no
filesystem. Never emit "open" or "save" operations, and never reference local
file paths (displacement maps, patterns, textures on disk).

# Format

Each action is a JSON object:
- `_obj` names the operation ("emboss", "make", "set", ...)
- the remaining keys are operation parameters
- structured values carry type markers such as `_enum`, `_unit`, `_value`, `_ref`

# Examples

Emboss:
```json
{"_obj": "emboss", "amount": 100, "angle": 135, "height": 3}
```

Layer opacity:
```json
{"_obj": "set", "_target": [{"_enum": "ordinal", "_ref": "layer"}], "to": {"_obj": "layer", "opacity": {"_unit": "percentUnit", "_value": 75.0}}}
```

Show or hide the current layer:
```json
{"_obj": "show", "null": [{"_enum": "ordinal", "_ref": "layer"}]}
{"_obj": "hide", "null": [{"_enum": "ordinal", "_ref": "layer"}]}
```

New layer, delete layer, select by name:
```json
{"_obj": "make", "_target": [{"_ref": "layer"}]}
{"_obj": "delete", "_target": [{"_enum": "ordinal", "_ref": "layer"}]}
{"_obj": "select", "_target": [{"_ref": "layer", "_name": "Background"}]}
```

Fill with the foreground color:
```json
{"_obj": "fill", "mode": {"_enum": "blendMode", "_value": "normal"}, "opacity": {"_unit": "percentUnit", "_value": 100.0}, "using": {"_enum": "fillContents", "_value": "foregroundColor"}}
```

# Rules

1. Output only a JSON array of action objects.
2. Map every Photoshop step to one or more actions, in tutorial order.
3. Keep parameter values the tutorial states; use defaults otherwise.
4. Skip steps that are not Photoshop operations or are unclear.
5. No explanations and no comments.
"#;

/// User turn for the chat strategy.
pub fn user_prompt(content: &str, source: &str, source_kind: &str) -> String {
    format!(
        "Convert the following Photoshop tutorial into Photoshop API JSON actions.\n\
         \n\
         Tutorial Source: {source}\n\
         Tutorial Type: {source_kind}\n\
         \n\
         Tutorial Content:\n\
         {content}\n\
         \n\
         Only Photoshop operations, in order, with no open/save steps and no file paths.\n\
         Return ONLY the JSON array.\n\
         \n\
         Output the JSON array now:"
    )
}

/// One worked user/assistant exchange placed before the real request.
pub fn few_shot_examples() -> Vec<ChatMessage> {
    let answer = json!([
        {"_obj": "emboss", "amount": 200, "angle": 90, "height": 5},
        {
            "_obj": "set",
            "_target": [{"_enum": "ordinal", "_ref": "layer"}],
            "to": {"_obj": "layer", "opacity": {"_unit": "percentUnit", "_value": 80.0}}
        }
    ]);
    let example = "1. Open the sunflower.jpg image\n\
                   2. Apply an emboss filter with amount 200, angle 90, and height 5\n\
                   3. Reduce opacity to 80%\n\
                   4. Save the result as embossed-flower.jpg";
    vec![
        ChatMessage::user(user_prompt(example, "example.com/tutorial", "web")),
        ChatMessage::assistant(serde_json::to_string_pretty(&answer).unwrap_or_default()),
    ]
}

/// Total characters sent as prompt scaffolding, for cost estimates.
pub fn chat_prompt_chars(few_shot: bool) -> usize {
    let base = SYSTEM_PROMPT.chars().count();
    if few_shot {
        base + few_shot_examples()
            .iter()
            .map(|m| m.content.chars().count())
            .sum::<usize>()
    } else {
        base
    }
}

pub const AGENT_SYSTEM_PROMPT: &str = r#"You generate Photoshop API ActionJSON from tutorial transcripts.

Your working directory is a documentation folder. Read it before answering.
Use relative paths.

1. Read `atomic_actions/index.md`. It lists every documented operation and its file.
2. Match each tutorial step to an entry in the index, for example
   "blur background" -> `filters/gaussian_blur.md`,
   "duplicate layer" -> `layer_management/duplicate_layer.md`,
   "select subject" -> `selection/select_subject.md`.
3. Read the matching documentation file for every operation you will use.
4. Only then write the answer, copying the JSON shapes from the documentation.

Rules:
- No open or save operations; the document is already loaded.
- Prefer ordinal layer references.
- Keep parameter values stated in the tutorial.
- Skip steps that are not Photoshop operations.
- When the tutorial places another image, use `placeEvent` with
  `ACTION_JSON_OPTIONS_ADDITIONAL_IMAGES_0` (then `_1`, `_2`, ...).

Your final message must be ONLY a JSON array, for example:
[
  {"_obj": "brightnessEvent", "brightness": 20, "center": 10, "useLegacy": false},
  {"_obj": "gaussianBlur", "radius": {"_unit": "pixelsUnit", "_value": 5.0}}
]
"#;

/// User turn for the agent strategy.
pub fn agent_user_prompt(content: &str, source: &str, source_kind: &str) -> String {
    format!(
        "Convert the following Photoshop tutorial into ActionJSON.\n\
         \n\
         Tutorial Source: {source}\n\
         Tutorial Type: {source_kind}\n\
         \n\
         Tutorial Transcript:\n\
         {content}\n\
         \n\
         Read atomic_actions/index.md first, then the documentation for each operation you \
         need. Do not guess file names. Finish with the JSON array only."
    )
}
