use std::thread;

use noteleaf::{
    FolderItem, RenderContext, RenderService, estimate_reading_time, extract_description,
    extract_title, render_markdown, render_markdown_lossy, render_service,
};

fn render(markdown: &str) -> String {
    render_markdown(markdown, None).expect("render succeeds")
}

#[test]
fn script_vectors_never_survive_sanitisation() {
    let hostile = [
        "<script>alert(1)</script>",
        "before <img src=x onerror=alert(1)> after",
        "[click](javascript:alert(1))",
        "[[Note|<script>alert(2)</script>]]",
        "==<img src=x onerror=alert(3)>==",
        "> [!note] <script>alert(4)</script>\n> body",
        "$<script>alert(5)</script>$",
        "```mermaid\n</div><script>alert(6)</script>\n```",
    ];
    for markdown in hostile {
        let html = render(markdown);
        assert!(
            !html.contains("<script"),
            "script tag leaked for {markdown:?}: {html}"
        );
        assert!(
            !html.contains("onerror"),
            "handler attribute leaked for {markdown:?}: {html}"
        );
        assert!(
            !html.contains("javascript:"),
            "javascript url leaked for {markdown:?}: {html}"
        );
    }
}

#[test]
fn sanitisation_is_idempotent() {
    let markdown = "# Title\n\n> [!tip]+ Fold\n> body with ==mark== and [[Link]]\n\n\
                    - [/] task\n\n```rust\nfn main() {}\n```\n\nMath: $x^2$\n";
    let html = render(markdown);
    let again = render_service().sanitize_html(&html);
    assert_eq!(html, again, "sanitising sanitized output must be a no-op");
}

#[test]
fn inline_math_renders_with_katex() {
    let html = render("Solve $x^2$ today");
    assert!(html.contains("class=\"katex"), "expected KaTeX markup: {html}");
    assert!(!html.contains("$x^2$"), "raw math source leaked: {html}");
}

#[test]
fn display_math_renders_as_block() {
    let html = render("$$\nE = mc^2\n$$");
    assert!(html.contains("data-math-style=\"display\""), "{html}");
    assert!(!html.contains("$$"), "raw display delimiters leaked: {html}");
}

#[test]
fn invalid_math_degrades_to_escaped_fallback() {
    let html = render("broken $\\frac{$ math");
    assert!(html.contains("math-error"), "{html}");
    assert!(html.contains("\\frac{"), "fallback must show the source: {html}");
}

#[test]
fn currency_text_is_not_math() {
    let html = render("it costs $5 and $6 total");
    assert!(html.contains("$5 and $6"), "{html}");
    assert!(!html.contains("katex"), "{html}");
}

#[test]
fn dollars_in_code_are_not_math() {
    let html = render("run `echo $HOME` or\n\n```\nexport $PATH\n```\n");
    assert!(html.contains("echo $HOME"), "{html}");
    assert!(html.contains("export $PATH"), "{html}");
    assert!(!html.contains("katex"), "{html}");
}

#[test]
fn wikilink_renders_inert_anchor() {
    let html = render("see [[Other Note]]");
    assert!(html.contains("data-wikilink-disabled"), "{html}");
    assert!(html.contains(">Other Note</a>"), "{html}");

    let html = render("see [[Other Note|Display]]");
    assert!(html.contains(">Display</a>"), "{html}");
}

#[test]
fn heading_wikilinks_target_heading_anchors() {
    let html = render("# My Heading\n\nJump to [[#My Heading]].");
    assert!(html.contains("<h1 id=\"my-heading\""), "{html}");
    assert!(html.contains("href=\"#my-heading\""), "{html}");
}

#[test]
fn url_fragments_are_not_tags() {
    let html = render("see https://x.com#frag for details");
    assert!(!html.contains("obsidian-tag"), "{html}");
}

#[test]
fn nested_tags_render_as_tags() {
    let html = render("tagged #project/urgent");
    assert!(
        html.contains("<span class=\"obsidian-tag\">#project/urgent</span>"),
        "{html}"
    );
}

#[test]
fn highlight_spans_become_mark() {
    let html = render("say ==this== loud");
    assert!(html.contains("<mark>this</mark>"), "{html}");
}

#[test]
fn callout_renders_title_and_body() {
    let html = render("> [!warning] Careful\n> body");
    assert!(html.contains("callout-warning"), "{html}");
    assert!(html.contains("Careful"), "{html}");
    assert!(html.contains("body"), "{html}");
    assert!(!html.contains("<details"), "plain callouts are not foldable: {html}");
    assert!(!html.contains("[!warning]"), "header line must be stripped: {html}");
}

#[test]
fn folded_callout_renders_closed_details() {
    let html = render("> [!tip]- Hidden\n> x");
    assert!(html.contains("<details"), "{html}");
    assert!(!html.contains("open"), "folded callout must not be open: {html}");
}

#[test]
fn foldable_open_callout_renders_open_details() {
    let html = render("> [!faq]+ Questions\n> answer");
    assert!(html.contains("<details"), "{html}");
    assert!(html.contains("open"), "{html}");
}

#[test]
fn unknown_callout_type_falls_back_to_note_styling() {
    let html = render("> [!frobnicate] Odd\n> body");
    assert!(html.contains("callout-note"), "{html}");
    assert!(html.contains("data-callout=\"frobnicate\""), "{html}");
}

#[test]
fn callout_without_title_uses_type_name() {
    let html = render("> [!warning]\n> body");
    assert!(html.contains("Warning"), "{html}");
}

#[test]
fn ordinary_blockquotes_render_unchanged() {
    let html = render("> just a quote");
    assert!(html.contains("<blockquote>"), "{html}");
    assert!(!html.contains("callout"), "{html}");
}

#[test]
fn custom_task_statuses_reach_the_checkbox() {
    let html = render("- [/] doing\n- [x] done\n- [ ] open item\n");
    assert!(html.contains("data-task=\"/\""), "{html}");
    assert!(html.contains("data-task=\"x\""), "{html}");
    assert!(html.contains("checked"), "x status renders checked: {html}");
    assert!(html.contains("data-task=\" \""), "{html}");
    assert!(html.contains("disabled"), "checkboxes are inert: {html}");
}

#[test]
fn unsafe_task_status_is_replaced_by_space() {
    let html = render("- [\u{E9}] accented\n");
    assert!(!html.contains("data-task=\"\u{E9}\""), "{html}");
    assert!(html.contains("data-task=\" \""), "{html}");
}

#[test]
fn mermaid_fences_become_marker_divs() {
    let output = render_service()
        .render("```mermaid\ngraph TD;A-->B;\n```\n", None)
        .expect("render succeeds");
    assert!(output.html.contains("<div class=\"mermaid\">"), "{}", output.html);
    assert!(output.html.contains("graph TD;A--&gt;B;"), "{}", output.html);
    assert!(output.contains_mermaid);
    assert!(!output.contains_code);
}

#[test]
fn code_blocks_get_header_and_copy_button() {
    let output = render_service()
        .render("```rust\nfn main() {}\n```\n", None)
        .expect("render succeeds");
    assert!(output.html.contains("data-role=\"code-copy-button\""), "{}", output.html);
    assert!(output.html.contains("data-language=\"rust\""), "{}", output.html);
    assert!(output.html.contains("<pre"), "{}", output.html);
    assert!(output.contains_code);
}

#[test]
fn image_embed_resolves_against_share_slug() {
    let context = RenderContext::for_slug("my-share");
    let html = render_markdown("![[Pasted Image.png]]", Some(&context)).expect("render");
    assert!(
        html.contains("/my-share/_assets/Pasted%20Image.png"),
        "{html}"
    );
}

#[test]
fn image_embed_without_context_renders_placeholder() {
    let html = render("![[photo.png]]");
    assert!(html.contains("embed-placeholder"), "{html}");
    assert!(!html.contains("<img"), "{html}");
}

#[test]
fn note_embed_uses_folder_listing() {
    let context = RenderContext::default()
        .with_folder_items(vec![FolderItem::doc("Projects/Roadmap.md", "Roadmap")]);
    let html = render_markdown("![[Projects/Roadmap]]", Some(&context)).expect("render");
    assert!(html.contains("embed-note-found"), "{html}");
    assert!(html.contains("Roadmap"), "{html}");

    let html = render("![[Unknown Note]]");
    assert!(html.contains("Embedded note"), "{html}");
}

#[test]
fn frontmatter_and_comments_do_not_render() {
    let html = render("---\ntitle: Secret Title\n---\nvisible %%hidden words%% text");
    assert!(!html.contains("Secret Title"), "{html}");
    assert!(!html.contains("hidden words"), "{html}");
    assert!(html.contains("visible"), "{html}");
}

#[test]
fn title_extraction_round_trips() {
    assert_eq!(extract_title("# Hello\nBody", "x"), "Hello");
    assert_eq!(
        extract_title("---\ntitle: Foo\n---\n# Hello\nBody", "x"),
        "Foo"
    );
    assert_eq!(extract_title("plain text", "Fallback"), "Fallback");
}

#[test]
fn description_and_reading_time_derive_from_source() {
    let markdown = "---\ntitle: T\n---\n# H\n\nFirst paragraph of prose.\n\nMore.";
    assert_eq!(
        extract_description(markdown, "x"),
        "First paragraph of prose."
    );
    assert_eq!(estimate_reading_time(""), 0);
    assert_eq!(estimate_reading_time(&"word ".repeat(250)), 2);
}

#[test]
fn lossy_facade_renders_normal_documents() {
    let html = render_markdown_lossy("# Fine\n\nAll good.", None);
    assert!(html.contains("Fine"), "{html}");
    assert!(!html.contains("render-failure"), "{html}");
}

#[test]
fn concurrent_renders_keep_their_own_embed_context() {
    let context_a = RenderContext::for_slug("share-a")
        .with_folder_items(vec![FolderItem::doc("Alpha.md", "Alpha Note")]);
    let context_b = RenderContext::for_slug("share-b")
        .with_folder_items(vec![FolderItem::doc("Beta.md", "Beta Note")]);

    let handles: Vec<_> = (0..8)
        .map(|index| {
            let even = index % 2 == 0;
            let context = if even {
                context_a.clone()
            } else {
                context_b.clone()
            };
            thread::spawn(move || {
                let (markdown, expected, foreign) = if even {
                    ("![[Alpha]] and $a^2$", "Alpha Note", "Beta Note")
                } else {
                    ("![[Beta]] and $b^2$", "Beta Note", "Alpha Note")
                };
                let html = render_markdown(markdown, Some(&context)).expect("render");
                assert!(html.contains(expected), "own context lost: {html}");
                assert!(
                    !html.contains(foreign),
                    "context leaked across renders: {html}"
                );
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("render thread panicked");
    }
}
