//! Module system runtime for bundled output.
//!
//! The emitted Lua mirrors the Rust core: textual path normalization,
//! relative-then-roots resolution with the `/init` package fallback, a
//! memo table keyed by resolved path, and a cycle error instead of
//! unbounded recursion. The `__roots` table is emitted between the two
//! prelude halves so the resolver below captures it as an upvalue.

/// Registry state and path normalization.
pub const PRELUDE_STATE: &str = r#"-- Module registry, memo table and in-progress marks
local __modules = {}
local __cache = {}
local __loading = {}

local function __normalize(path)
    local segments = {}
    for segment in string.gmatch(path, "[^/]+") do
        if segment == ".." then
            if #segments > 0 then
                table.remove(segments)
            end
        elseif segment ~= "." then
            segments[#segments + 1] = segment
        end
    end
    return table.concat(segments, "/")
end

local function __match(candidate)
    if __modules[candidate] then
        return candidate
    end
    local init = __normalize(candidate .. "/init")
    if __modules[init] then
        return init
    end
    return nil
end
"#;

/// Resolution and memoized loading. Depends on `__roots` being declared
/// between the two prelude halves.
pub const PRELUDE_RESOLVER: &str = r#"local function __resolve(specifier, caller)
    if caller then
        local dir = string.match(caller, "^(.*)/[^/]*$") or ""
        local key = __match(__normalize(dir .. "/" .. specifier))
        if key then
            return key
        end
    end
    for _, root in ipairs(__roots) do
        local key = __match(__normalize(root .. "/" .. specifier))
        if key then
            return key
        end
    end
    return nil
end

local function __load(specifier, caller)
    local key = __resolve(specifier, caller)
    if not key then
        error("cannot resolve module '" .. specifier .. "' required from '"
            .. (caller or "<entry>") .. "'", 0)
    end
    local cached = __cache[key]
    if cached then
        return cached.value
    end
    if __loading[key] then
        error("cyclic module chain at '" .. key .. "'", 0)
    end
    __loading[key] = true
    local function require(spec)
        return __load(spec, key)
    end
    local value = __modules[key](require)
    __loading[key] = nil
    __cache[key] = { value = value }
    return value
end
"#;

/// The `__roots` declaration: configured prefixes in priority order.
pub fn search_roots(roots: &[String]) -> String {
    let quoted: Vec<String> = roots.iter().map(|root| lua_quote(root)).collect();
    format!("local __roots = {{ {} }}\n", quoted.join(", "))
}

/// The kickoff call that starts traversal at the entry key and returns
/// its export from the bundle chunk.
pub fn entry_invocation(entry_key: &str) -> String {
    format!("return __load({}, nil)\n", lua_quote(entry_key))
}

/// Quote a string as a Lua string literal. Control characters get escaped;
/// zero-padded `\ddd` keeps a following digit from extending the escape.
pub fn lua_quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                quoted.push_str(&format!("\\{:03}", c as u32));
            }
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}
