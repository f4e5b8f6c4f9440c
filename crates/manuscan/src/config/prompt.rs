//! Built-in analysis prompt. Operators can replace it through the config file
//! (`prompt` / `prompt_file`) or the `--prompt-file` flag.

pub const DEFAULT_PROMPT: &str = r#"You are an expert for interpreting Tibetan manuscripts.
Attached you will find an image of a Tibetan manuscript. Use your expertise to analyze the image and provide responses. The analysis should specifically account for the presence of Tibetan, Chinese, and Arabic numerals, as well as structural and illustrative elements. Consider the following charsets for enhanced accuracy:
Tibetan script (U+0F00–U+0FFF): Including Tibetan characters, numerals (e.g., ཀ, ཁ, ག, ༡, ༢, ༣), and annotations.
Chinese characters (U+4E00–U+9FFF): Traditional and simplified forms.
Arabic numerals (0–9): Standard decimal numbers.

Answer the following questions and respond as a pure JSON object the following format:

"Chinese character present" (Bool): Is there at least one Chinese character or number on the image
"Chinese page number" (Bool): Does the image contain at least one chinese character or number, that is vertical oriented and is on the right side of the image outside of the tibet?
"Arabic numeral present" (Bool): Does the image contain an Arabic numeral?
"Arabic numeral int" (Integer): If there is an Arabic numeral, which one?
"Illustration present" (Bool): Does the image contain an illustration? Round red stamps are not illustrations
"Illustration position" (String): If the image contains not an illustration return 'none', else return the postion of the illustrated area as 'left', 'right' or 'center'
"Illustration caption" (Bool): Does the image contain an illustration with a caption?
"Tibetian page number" (Bool): Does the image contain a page number in tibetian, that are vertical oriented and left aligned. If so return 'true', 'false' otherwise
"Frame present" (String): Analyze the image to detect vertical lines framing the text. The lines may be thin, uniform, and either red or black. Respond with one of the following: None if no lines are present, Red if red lines are detected, or Black if black lines are detected
"#;

/// System message sent ahead of the operator prompt.
pub const SYSTEM_PROMPT: &str = "You are a multi-modal assistant that answers questions based on the provided context. \
Use the information from the context and the provided image to answer the question. \
If you can't find relevant information in the context, say so.";
