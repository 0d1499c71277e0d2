use crate::library::{VendoredLibrary, VendoredList};

use super::parse::COLUMN_SEPARATOR;

/// Organisation whose repositories get a `org/` prefix in the version cell.
const FIRST_PARTY_ORG: &str = "pymedusa";
const SHORT_HASH_LEN: usize = 7;

pub(crate) const HEADER_COLUMNS: &str = "Folder | Package | Version / Commit | Used By | Notes / Modules";
pub(crate) const HEADER_ALIGNMENT: &str = ":----: | :-----: | :--------------: | :------ | :--------------";

pub(crate) fn header_lines(folder: &str) -> Vec<String> {
    vec![
        format!("## {folder}"),
        HEADER_COLUMNS.to_string(),
        HEADER_ALIGNMENT.to_string(),
    ]
}

pub(crate) fn footer_lines(folder: &str) -> Vec<String> {
    vec![
        String::new(),
        "#### Notes:".to_string(),
        format!("- `{folder}` compatible with Python 2 and Python 3"),
        format!("- `{folder}2` only compatible with Python 2"),
        format!("- `{folder}3` only compatible with Python 3"),
    ]
}

fn is_single_file_form(lib: &VendoredLibrary) -> bool {
    lib.extras.is_empty() && lib.modules.len() == 1 && lib.modules[0] == format!("{}.py", lib.name)
}

fn folder_cell(lib: &VendoredLibrary) -> String {
    let joined = lib.folder.join(" ");
    if lib.targets_python2() || lib.targets_python3() {
        format!("**{joined}**")
    } else {
        joined
    }
}

fn package_cell(lib: &VendoredLibrary) -> String {
    if is_single_file_form(lib) {
        return format!("<code><b>{}</b>.py</code>", lib.name);
    }
    let package = format!("`{}`", lib.package());
    if lib.main_module_matches_package_name() {
        format!("**{package}**")
    } else {
        package
    }
}

fn version_cell(lib: &VendoredLibrary) -> String {
    let Some(version) = lib.version.as_deref() else {
        return "-".to_string();
    };
    let url = lib.url.as_deref().unwrap_or_default();
    if !lib.git {
        return format!("[{version}]({url})");
    }
    let short: String = version.chars().take(SHORT_HASH_LEN).collect();
    let label = match lib.branch.as_deref() {
        Some(branch) => format!("{branch}@{short}"),
        None => short,
    };
    let org = if url.contains(&format!("/{FIRST_PARTY_ORG}/")) {
        format!("{FIRST_PARTY_ORG}/")
    } else {
        String::new()
    };
    format!("{org}[{label}]({url})")
}

fn notes_cell(lib: &VendoredLibrary) -> String {
    let mut segments = Vec::new();
    if lib.modules.len() > 1 {
        let listed: Vec<String> = lib.modules.iter().map(|m| format!("`{m}`")).collect();
        segments.push(format!("Modules: {}", listed.join(", ")));
    } else if !lib.main_module_matches_package_name() && !is_single_file_form(lib) {
        let kind = if lib.is_main_module_file() { "File" } else { "Module" };
        segments.push(format!("{kind}: `{}`", lib.main_module()));
    }
    segments.extend(lib.notes.iter().cloned());
    if segments.is_empty() {
        "-".to_string()
    } else {
        segments.join("<br>")
    }
}

/// Encodes one record as a table row.
pub fn make_list_item(lib: &VendoredLibrary) -> String {
    [
        folder_cell(lib),
        package_cell(lib),
        version_cell(lib),
        lib.usage.to_string(),
        notes_cell(lib),
    ]
    .join(COLUMN_SEPARATOR)
}

/// Canonical document for `list`, titled after its shared folder.
pub fn make_md(list: &VendoredList) -> String {
    let folder = list.folder().unwrap_or_else(|| super::DEFAULT_TARGET.to_string());
    make_md_for(list, &folder)
}

pub fn make_md_for(list: &VendoredList, folder: &str) -> String {
    let mut lines = header_lines(folder);
    lines.extend(list.iter().map(make_list_item));
    lines.extend(footer_lines(folder));
    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::fixtures::*;
    use crate::manifest::parse::parse_line;

    #[test]
    fn renders_rows_like_the_hand_written_manifest() {
        let cases = [
            (
                cachecontrol(),
                "ext | `CacheControl` | [0.12.6](https://pypi.org/project/CacheControl/0.12.6/) | **`medusa`** | Module: `cachecontrol`",
            ),
            (
                beautifulsoup4(),
                "**ext2 ext3** | `beautifulsoup4[html5lib]` | [4.9.1](https://pypi.org/project/beautifulsoup4/4.9.1/) | **`medusa`**, `subliminal` | Module: `bs4`",
            ),
            (
                html5lib(),
                "ext | **`html5lib`** | [1.1](https://pypi.org/project/html5lib/1.1/) | **`medusa`** (via `beautifulsoup4`), `beautifulsoup4` | -",
            ),
            (
                subliminal(),
                "ext | **`subliminal`** | [develop@76525cc](https://github.com/Diaoul/subliminal/tree/76525cc2f6545aeeccf620ca46d40c2f0aa53c6d) | **`medusa`** | -",
            ),
            (
                pytimeparse(),
                "ext | **`pytimeparse`** | pymedusa/[8f28325](https://github.com/pymedusa/pytimeparse/tree/8f2832597235c6ec98c44de4dab3274927f67e29) | **`medusa`** | -",
            ),
            (
                configobj(),
                "ext | `configobj` | [5.0.6](https://pypi.org/project/configobj/5.0.6/) | **`medusa`** | Modules: `configobj.py`, `validate.py`, `_version.py`",
            ),
            (
                ttl_cache(),
                "ext | `ttl-cache` | [1.6](https://pypi.org/project/ttl-cache/1.6/) | **`medusa`** | File: `ttl_cache.py`",
            ),
            (
                not_a_package(),
                "ext | `zzz-not-a-package` | - | `<UNUSED>` | Module: `my_module`",
            ),
            (
                single_file_from_github(),
                "ext | `zzz-single-file-from-github` | [abcdef0](https://github.com/owner/repo/blob/abcdef0123456789abcdef0123456789abcdef01/path/to/my_file.py) | `<UPDATE-ME>` | File: `my_file.py`",
            ),
            (
                appdirs(),
                "ext | <code><b>appdirs</b>.py</code> | [1.4.3](https://pypi.org/project/appdirs/1.4.3/) | `simpleanidb`, `subliminal` (cli only) | -",
            ),
        ];
        for (lib, expected) in cases {
            assert_eq!(make_list_item(&lib), expected);
        }
    }

    #[test]
    fn rows_decode_back_to_the_same_record() {
        for lib in [
            adba(),
            appdirs(),
            backports_abc(),
            beautifulsoup4(),
            bleach(),
            cachecontrol(),
            html5lib(),
            subliminal(),
            pytimeparse(),
            configobj(),
            ttl_cache(),
            not_a_package(),
            single_file_from_github(),
        ] {
            let line = make_list_item(&lib);
            let decoded = parse_line(&line, 4).unwrap();
            assert_eq!(decoded, lib, "{line}");
            assert_eq!(make_list_item(&decoded), line);
        }
    }

    #[test]
    fn single_number_release_survives_a_round_trip() {
        let lib = bleach();
        let line = make_list_item(&lib);
        assert_eq!(
            line,
            "ext | **`bleach`** | [2](https://pypi.org/project/bleach/2/) | **`medusa`** | -"
        );
        let decoded = parse_line(&line, 4).unwrap();
        assert!(!decoded.git);
        assert_eq!(decoded, lib);
    }

    #[test]
    fn free_text_notes_follow_module_annotation() {
        let mut lib = ttl_cache();
        lib.notes = vec!["Vendored for py2".into(), "See #123".into()];
        assert!(make_list_item(&lib).ends_with("File: `ttl_cache.py`<br>Vendored for py2<br>See #123"));
    }

    #[test]
    fn document_has_header_rows_and_footer() {
        let mut list = VendoredList::new();
        list.add(html5lib()).unwrap();
        list.add(adba()).unwrap();
        let md = make_md(&list);
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines[0], "## ext");
        assert_eq!(lines[1], HEADER_COLUMNS);
        assert_eq!(lines[2], HEADER_ALIGNMENT);
        assert!(lines[3].starts_with("ext | **`adba`** | pymedusa/[6efeff3]"));
        assert!(lines[4].starts_with("ext | **`html5lib`**"));
        assert_eq!(lines[5], "");
        assert_eq!(lines[6], "#### Notes:");
        assert_eq!(lines[9], "- `ext3` only compatible with Python 3");
        assert!(md.ends_with('\n'));
    }
}
