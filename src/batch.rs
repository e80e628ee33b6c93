//! Batch completion of blanked stories.
//!
//! A batch file holds several partial stories. A line with neither role
//! markers nor the blank marker is a title and starts a new story:
//!
//! ```text
//! Histoire 1
//! [sujet] chat [predicat] manger [objet] croquettes
//! ?
//! [sujet] chat [predicat] dormir
//! ```

use crate::predict::Prediction;
use crate::tagger::is_tagged_line;

/// One partial story of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BlankedStory {
    pub title: String,
    pub lines: Vec<String>,
}

/// Split a batch into stories. Lines before the first title form an untitled
/// story; stories without lines are dropped.
pub fn parse_blanked_stories(text: &str, marker: &str) -> Vec<BlankedStory> {
    let mut stories: Vec<BlankedStory> = Vec::new();
    let mut current = BlankedStory {
        title: String::new(),
        lines: Vec::new(),
    };
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !is_tagged_line(line) && !line.contains(marker) {
            let next = BlankedStory {
                title: line.to_string(),
                lines: Vec::new(),
            };
            stories.push(std::mem::replace(&mut current, next));
        } else {
            current.lines.push(line.to_string());
        }
    }
    stories.push(current);
    stories.retain(|s| !s.lines.is_empty());
    stories
}

/// Interleave predictions back into `lines`: each blank becomes
/// `> <prediction>`, other lines are kept.
pub fn complete(lines: &[String], predictions: &[Prediction], marker: &str) -> Vec<String> {
    let mut predictions = predictions.iter();
    lines
        .iter()
        .map(|line| {
            if line.trim() != marker {
                return line.clone();
            }
            match predictions.next() {
                Some(p) => format!("> {}", p.render(marker)),
                None => format!("> {marker}"),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factoid::Factoid;

    #[test]
    fn titles_split_stories() {
        let text = "Histoire 1\n[sujet] chat [predicat] manger\n?\n\nHistoire 2\nHistoire 3\n?\n[sujet] chien [predicat] dormir\n";
        let stories = parse_blanked_stories(text, "?");
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[0].title, "Histoire 1");
        assert_eq!(stories[0].lines, vec!["[sujet] chat [predicat] manger", "?"]);
        assert_eq!(stories[1].title, "Histoire 3");
    }

    #[test]
    fn untitled_leading_lines_form_a_story() {
        let stories = parse_blanked_stories("[sujet] chat [predicat] manger\n?", "?");
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].title, "");
    }

    #[test]
    fn blanks_are_replaced_in_order() {
        let lines: Vec<String> = ["[sujet] chat [predicat] manger", "?", "?"]
            .into_iter()
            .map(String::from)
            .collect();
        let predictions = vec![
            Prediction::Resolved {
                factoid: Factoid::from_parts("chat", "dormir", "", "", ""),
                score: 4.0,
                origin_story: "repas_1".into(),
            },
            Prediction::Unresolved,
        ];
        let out = complete(&lines, &predictions, "?");
        assert_eq!(
            out,
            vec![
                "[sujet] chat [predicat] manger",
                "> [sujet] chat [predicat] dormir",
                "> ?",
            ]
        );
    }
}
