//! 解析ステージ判定
//!
//! 解析サービスが返す自由記述の `stage` 文字列を、固定5段階の進捗表示へ写像する。
//! - 明示タグ（connecting / ocr / components / verify / done）を優先
//! - それ以外は既知ステージIDの部分一致（大文字小文字無視）

use serde::{Deserialize, Serialize};

/// 進捗表示の1段階
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDef {
    pub id: &'static str,
    pub label: &'static str,
}

/// 固定の5段階（順序に意味がある）
pub const STAGES: [StageDef; 5] = [
    StageDef { id: "connecting", label: "Connecting" },
    StageDef { id: "gemini", label: "Reading labels" },
    StageDef { id: "claude", label: "Analyzing components" },
    StageDef { id: "openai", label: "Verifying results" },
    StageDef { id: "complete", label: "Complete" },
];

/// 各段階の描画状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Complete,
    InProgress,
    Pending,
}

impl StepState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepState::Complete => "complete",
            StepState::InProgress => "in-progress",
            StepState::Pending => "pending",
        }
    }
}

/// 解析サービスと合意した明示タグ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageTag {
    Connecting,
    Ocr,
    Components,
    Verify,
    Done,
}

impl StageTag {
    /// タグ文字列と完全一致した場合のみ Some
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "connecting" => Some(StageTag::Connecting),
            "ocr" => Some(StageTag::Ocr),
            "components" => Some(StageTag::Components),
            "verify" => Some(StageTag::Verify),
            "done" => Some(StageTag::Done),
            _ => None,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            StageTag::Connecting => 0,
            StageTag::Ocr => 1,
            StageTag::Components => 2,
            StageTag::Verify => 3,
            StageTag::Done => 4,
        }
    }
}

/// 部分一致による現在ステージ判定。一致なしは None
pub fn current_stage_index(raw: &str) -> Option<usize> {
    let lower = raw.to_lowercase();
    STAGES.iter().position(|s| lower.contains(s.id))
}

/// 明示タグ → 部分一致の順で現在ステージを解決
pub fn resolve_stage_index(raw: &str) -> Option<usize> {
    StageTag::parse(raw)
        .map(|tag| tag.index())
        .or_else(|| current_stage_index(raw))
}

/// 5段階それぞれの描画状態
pub fn step_states(raw: &str) -> [StepState; 5] {
    let mut states = [StepState::Pending; 5];
    let Some(current) = resolve_stage_index(raw) else {
        return states;
    };

    let finished = raw.to_lowercase().contains("complete")
        || StageTag::parse(raw) == Some(StageTag::Done);

    for (i, state) in states.iter_mut().enumerate() {
        *state = if i < current {
            StepState::Complete
        } else if i == current {
            if finished { StepState::Complete } else { StepState::InProgress }
        } else {
            StepState::Pending
        };
    }
    states
}

#[cfg(test)]
mod tests {
    use super::*;
    use StepState::*;

    #[test]
    fn test_known_stage_strings() {
        let cases = [
            ("connecting", Some(0)),
            ("Connecting to analysis service", Some(0)),
            ("gemini ocr", Some(1)),
            ("GEMINI_READING_LABELS", Some(1)),
            ("claude", Some(2)),
            ("Claude component analysis", Some(2)),
            ("openai verify", Some(3)),
            ("OpenAI", Some(3)),
            ("complete", Some(4)),
            ("Analysis Complete", Some(4)),
            ("", None),
            ("uploading", None),
            ("ocr", None),
        ];
        for (raw, expected) in cases {
            assert_eq!(current_stage_index(raw), expected, "stage: {:?}", raw);
        }
    }

    #[test]
    fn test_claude_stage_marks_earlier_complete() {
        assert_eq!(current_stage_index("claude"), Some(2));
        assert_eq!(
            step_states("analysing with claude"),
            [Complete, Complete, InProgress, Pending, Pending]
        );
    }

    #[test]
    fn test_first_matching_stage_wins() {
        // "connecting" が先に並ぶため index 0
        assert_eq!(current_stage_index("connecting to claude"), Some(0));
    }

    #[test]
    fn test_complete_marks_all_done() {
        assert_eq!(step_states("complete"), [Complete; 5]);
    }

    #[test]
    fn test_complete_substring_finishes_current_step() {
        // 現在ステージ自体が "complete" を含めばスピナーを出さない
        assert_eq!(
            step_states("gemini complete"),
            [Complete, Complete, Pending, Pending, Pending]
        );
    }

    #[test]
    fn test_unmatched_stage_all_pending() {
        assert_eq!(step_states("warming up"), [Pending; 5]);
        assert_eq!(step_states(""), [Pending; 5]);
    }

    #[test]
    fn test_explicit_tags() {
        assert_eq!(resolve_stage_index("ocr"), Some(1));
        assert_eq!(resolve_stage_index("components"), Some(2));
        assert_eq!(resolve_stage_index("Verify"), Some(3));
        assert_eq!(step_states("verify"), [Complete, Complete, Complete, InProgress, Pending]);
        assert_eq!(step_states("done"), [Complete; 5]);
    }

    #[test]
    fn test_tag_deserialize() {
        let tag: StageTag = serde_json::from_str("\"components\"").expect("デシリアライズ失敗");
        assert_eq!(tag, StageTag::Components);
    }

    #[test]
    fn test_monotonic_over_stage_sequence() {
        let sequence = ["connecting", "gemini ocr", "claude", "openai", "complete"];
        let mut last = 0;
        for raw in sequence {
            let idx = current_stage_index(raw).expect("一致なし");
            assert!(idx >= last);
            let states = step_states(raw);
            assert!(states[..idx].iter().all(|s| *s == Complete));
            last = idx;
        }
    }
}
