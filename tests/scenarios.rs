//! End-to-end runs of the tree-sitter front-end and every rule.

use cpp_refactor::{
    CollectingSink, IncludeOptions, NullSink, RefactorEngine, RuleId, RuleSet, RunOutcome,
    TreeSitterFrontend, UnitBuilder,
};
use std::path::{Path, PathBuf};

fn engine() -> RefactorEngine<TreeSitterFrontend> {
    RefactorEngine::new(TreeSitterFrontend::new(), RuleSet::all())
}

fn run_with(builder: &UnitBuilder, code: &str) -> RunOutcome {
    let unit = builder.from_source(Path::new("test.cpp"), code).unwrap();
    engine().run(&unit, &mut NullSink).unwrap()
}

fn refactor(code: &str) -> String {
    run_with(&UnitBuilder::default(), code).render()
}

#[test]
fn adds_virtual_to_base_destructor() {
    let input = r#"
class Base {
public:
    ~Base() {}
};
class Derived : public Base {};

class Standalone {
public:
    ~Standalone() {}
};

class BaseAlreadyVirtual {
public:
    virtual ~BaseAlreadyVirtual() {}
};
class DerivedFromVirtual : public BaseAlreadyVirtual {};
"#;
    let expected = r#"
class Base {
public:
    virtual ~Base() {}
};
class Derived : public Base {};

class Standalone {
public:
    ~Standalone() {}
};

class BaseAlreadyVirtual {
public:
    virtual ~BaseAlreadyVirtual() {}
};
class DerivedFromVirtual : public BaseAlreadyVirtual {};
"#;
    assert_eq!(refactor(input), expected);
}

#[test]
fn one_line_base_destructor() {
    assert_eq!(
        refactor("class Base { public: ~Base(){} }; class Derived: public Base{};"),
        "class Base { public: virtual ~Base(){} }; class Derived: public Base{};"
    );
}

#[test]
fn adds_override_to_methods() {
    let input = r#"
class Base {
public:
    virtual void func() {}
    virtual ~Base() {}
};

class Derived : public Base {
public:
    void func() {}
    ~Derived() {}
};

class AlreadyWithOverride : public Base {
public:
    void func() override {}
};
"#;
    let expected = r#"
class Base {
public:
    virtual void func() {}
    virtual ~Base() {}
};

class Derived : public Base {
public:
    void func() override {}
    ~Derived() {}
};

class AlreadyWithOverride : public Base {
public:
    void func() override {}
};
"#;
    assert_eq!(refactor(input), expected);
}

#[test]
fn adds_reference_to_range_for_variable() {
    let input = r#"#include <vector>
struct CustomType { int x; };

void process() {
    std::vector<CustomType> vec;
    for (const auto x : vec) {
        (void)x;
    }

    std::vector<int> ints;
    for (const int i : ints) {
        (void)i;
    }

    std::vector<CustomType> vec2;
    for (const auto& x : vec2) {
        (void)x;
    }
}
"#;
    let expected = input.replacen("const auto x", "const auto & x", 1);
    assert_eq!(refactor(input), expected);
}

#[test]
fn inheritance_chain_fixes_every_base() {
    let input = r#"
class A {
public:
    ~A() {}
};
class B : public A {
public:
    ~B() {}
};
class C : public B {};
"#;
    let expected = r#"
class A {
public:
    virtual ~A() {}
};
class B : public A {
public:
    virtual ~B() {}
};
class C : public B {};
"#;
    assert_eq!(refactor(input), expected);
}

#[test]
fn explicitly_typed_loop_variable() {
    let input = r#"#include <vector>
struct MyStruct { int a; };
void foo() {
  std::vector<MyStruct> items;
  for (const MyStruct item : items) {
    (void)item;
  }
}
"#;
    let expected = input.replace("const MyStruct item", "const MyStruct & item");
    assert_eq!(refactor(input), expected);
}

#[test]
fn compliant_code_is_unchanged() {
    let input = r#"#include <vector>
struct S { int val; };

class Base {
public:
    virtual void check() = 0;
    virtual ~Base() = default;
};

class Derived : public Base {
public:
    void check() override {}
    ~Derived() {}
};

void process() {
    std::vector<S> items;
    for (const S& item : items) {
        (void)item;
    }
    std::vector<int> nums;
    for (int num : nums) {
        (void)num;
    }
}
"#;
    let outcome = run_with(&UnitBuilder::default(), input);
    assert!(!outcome.is_modified());
    assert_eq!(outcome.render(), input);
}

#[test]
fn second_run_changes_nothing() {
    let input = r#"
struct Shape { ~Shape() {} virtual double area() const { return 0; } };
struct Circle : Shape { double area() const { return 3.14; } };
void total(const std::vector<Circle>& cs) {
    for (const auto c : cs) { c.area(); }
}
"#;
    let once = refactor(input);
    assert_ne!(once, input);
    assert_eq!(refactor(&once), once);
}

#[test]
fn qualifiers_stay_in_front_of_override() {
    let input = r#"
struct Base { virtual int get() const noexcept; virtual void put(int) &; };
struct Impl : Base { int get() const noexcept; void put(int v) &; };
"#;
    let expected = r#"
struct Base { virtual int get() const noexcept; virtual void put(int) &; };
struct Impl : Base { int get() const noexcept override; void put(int v) & override; };
"#;
    assert_eq!(refactor(input), expected);
}

#[test]
fn destructor_made_virtual_by_its_base_is_left_alone() {
    let input = r#"
struct A { virtual ~A(); };
struct B : A { ~B(); };
struct C : B {};
"#;
    assert_eq!(refactor(input), input);
}

#[test]
fn headers_are_never_edited() {
    let builder = UnitBuilder::default().with_virtual_file(
        "base.h",
        "class Base {\npublic:\n    ~Base() {}\n    virtual void run() {}\n};\n",
    );
    let input = "#include \"base.h\"\nclass Worker : public Base {\npublic:\n    void run() {}\n};\n";

    let outcome = run_with(&builder, input);

    assert_eq!(
        outcome.render(),
        "#include \"base.h\"\nclass Worker : public Base {\npublic:\n    void run() override {}\n};\n"
    );
    assert_eq!(outcome.report.out_of_scope, 1);
    assert_eq!(outcome.report.applied, 1);
}

#[test]
fn override_detected_through_an_included_base() {
    let builder = UnitBuilder::new(IncludeOptions {
        search_paths: vec![PathBuf::from("include")],
        ..IncludeOptions::default()
    })
    .with_virtual_file("include/iface.h", "struct Iface { virtual void tick(int n) = 0; };\n");
    let input = "#include \"iface.h\"\nstruct Clock : Iface { void tick(int); };\n";

    assert_eq!(
        run_with(&builder, input).render(),
        "#include \"iface.h\"\nstruct Clock : Iface { void tick(int) override; };\n"
    );
}

#[test]
fn scalar_and_pointer_loop_variables_are_left_alone() {
    let input = r#"
enum Color { Red, Green };
struct P {};
void f(const std::vector<Color>& colors, const std::vector<P*>& ptrs, const std::string& s) {
    for (const auto c : colors) {}
    for (const auto p : ptrs) {}
    for (const char ch : s) {}
}
"#;
    assert_eq!(refactor(input), input);
}

#[test]
fn one_remark_per_edit() {
    let input = "class Base { public: ~Base(){} }; class Derived: public Base{};\n";
    let unit = UnitBuilder::default()
        .from_source(Path::new("test.cpp"), input)
        .unwrap();
    let mut sink = CollectingSink::new();

    let outcome = engine().run(&unit, &mut sink).unwrap();

    assert_eq!(sink.remarks.len(), outcome.edits.len());
    let remark = &sink.remarks[0];
    assert_eq!(remark.rule, RuleId::VirtualDestructor);
    assert_eq!(remark.entity, "Base");
    assert_eq!(remark.path.as_deref(), Some(Path::new("test.cpp")));
    assert_eq!(remark.location.map(|lc| (lc.line, lc.column)), Some((1, 22)));
}

#[test]
fn independent_units_run_concurrently() {
    let engine = engine();
    let inputs = [
        "struct A { ~A() {} }; struct B : A {};",
        "struct A { virtual void f(); }; struct B : A { void f(); };",
        "struct P {}; void g(const std::vector<P>& ps) { for (const auto p : ps) {} }",
    ];
    let expected = [
        "struct A { virtual ~A() {} }; struct B : A {};",
        "struct A { virtual void f(); }; struct B : A { void f() override; };",
        "struct P {}; void g(const std::vector<P>& ps) { for (const auto & p : ps) {} }",
    ];

    let outputs: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|input| {
                let engine = &engine;
                scope.spawn(move || {
                    let unit = UnitBuilder::default()
                        .from_source(Path::new("unit.cpp"), *input)
                        .unwrap();
                    engine.run(&unit, &mut NullSink).unwrap().render()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(outputs, expected);
}

#[test]
fn same_named_class_in_another_namespace_is_not_a_base() {
    let input = "namespace x { struct B { virtual void f(); }; }\nstruct B {};\nstruct D : B { void f(); };\n";
    assert_eq!(refactor(input), input);
}

#[test]
fn only_the_base_in_scope_gets_a_virtual_destructor() {
    let input = "namespace a { struct S { ~S() {} }; }\nnamespace b { struct S { ~S() {} }; struct D : S {}; }\n";
    assert_eq!(
        refactor(input),
        "namespace a { struct S { ~S() {} }; }\nnamespace b { struct S { virtual ~S() {} }; struct D : S {}; }\n"
    );
}

#[test]
fn qualified_base_names_are_looked_up_in_their_namespace() {
    let input = "namespace x { struct B { virtual void f(); }; }\nstruct B { void f(); };\nstruct D : x::B { void f(); };\n";
    assert_eq!(
        refactor(input),
        "namespace x { struct B { virtual void f(); }; }\nstruct B { void f(); };\nstruct D : x::B { void f() override; };\n"
    );
}

#[test]
fn override_through_a_template_specialization() {
    let input = r#"
template <class T> struct B { virtual void f(T); virtual ~B() {} };
struct D : B<int> { void f(int); void f(double); };
"#;
    let expected = r#"
template <class T> struct B { virtual void f(T); virtual ~B() {} };
struct D : B<int> { void f(int) override; void f(double); };
"#;
    assert_eq!(refactor(input), expected);
}

#[test]
fn out_of_line_definitions_are_never_edited() {
    let input = r#"
struct A { ~A(); };
struct B : A { virtual void f(); };
struct D : B { void f(); ~D(); };
A::~A() {}
void D::f() {}
D::~D() {}
"#;
    let expected = r#"
struct A { virtual ~A(); };
struct B : A { virtual void f(); };
struct D : B { void f() override; ~D(); };
A::~A() {}
void D::f() {}
D::~D() {}
"#;
    assert_eq!(refactor(input), expected);
}
