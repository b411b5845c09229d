use sapling_dom::{
	build, children, component,
	memory::{MemorySurface, NodeId},
	Callback, Config, Error, Node, Props, Runtime, Scope,
};

mod memory_logging_;

fn setup_with(config: Config) -> (MemorySurface, NodeId, Runtime<MemorySurface>) {
	memory_logging_::init();
	let surface = MemorySurface::new();
	let container = surface.create_container("main");
	let runtime = Runtime::with_config(surface.clone(), config);
	(surface, container, runtime)
}

fn setup() -> (MemorySurface, NodeId, Runtime<MemorySurface>) {
	setup_with(Config::default())
}

fn nested(depth: usize) -> Node {
	(1..depth).fold(build("div", Props::new(), children![]), |inner, _| build("div", Props::new(), children![inner]))
}

#[test]
fn handler_prop_with_string_value() {
	let (surface, container, runtime) = setup();

	let result = runtime.render(build("button", Props::new().with("onClick", "alert(1)"), children![]), &container);

	match result {
		Err(Error::MalformedProp { tag, name, .. }) => {
			assert_eq!(tag, "button");
			assert_eq!(name, "onClick");
		}
		other => panic!("Expected a malformed prop error, found {:?}", other),
	}
	assert!(surface.children(container).is_empty());
}

#[test]
fn handler_under_plain_name() {
	let (_, container, runtime) = setup();

	let result = runtime.render(build("button", Props::new().with("click", Callback::new(|_| ())), children![]), &container);

	assert!(matches!(result, Err(Error::MalformedProp { name, .. }) if name == "click"));
}

#[test]
fn lowercase_on_prop_is_an_attribute() {
	let (surface, container, runtime) = setup();

	runtime.render(build("div", Props::new().with("online", "yes"), children![]), &container).unwrap();

	let div = surface.children(container)[0];
	assert_eq!(surface.attribute(div, "online").as_deref(), Some("yes"));
}

#[test]
fn depth_limit() {
	let (surface, container, runtime) = setup_with(Config::new().with_depth_limit(3));

	runtime.render(nested(3), &container).unwrap();
	assert_eq!(surface.to_html(container), "<main><div><div><div></div></div></div></main>");

	let (surface, container, runtime) = setup_with(Config::new().with_depth_limit(3));
	let result = runtime.render(nested(5), &container);

	assert!(matches!(result, Err(Error::DepthLimit(3))));
	assert!(surface.children(container).is_empty());
	assert_eq!(surface.handler_count(), 0);
}

fn recursive(_: &mut Scope<'_>) -> Node {
	build("div", Props::new(), children![build(component(recursive), Props::new(), children![])])
}

#[test]
fn unbounded_recursion_hits_the_depth_limit() {
	let (surface, container, runtime) = setup_with(Config::new().with_depth_limit(64));

	let result = runtime.render(build(component(recursive), Props::new(), children![]), &container);

	assert!(matches!(result, Err(Error::DepthLimit(64))));
	assert!(surface.children(container).is_empty());
	assert_eq!(runtime.mounts()[0].instance_count(), 0);
}

#[test]
fn invalid_tag_is_a_surface_error() {
	let (surface, container, runtime) = setup();

	let result = runtime.render(build("div", Props::new(), children![build("not a tag", Props::new(), children![])]), &container);

	assert!(matches!(result, Err(Error::Surface(_))));
	assert!(surface.children(container).is_empty());
}

#[test]
fn mount_point_recovers_after_failed_creation() {
	let (surface, container, runtime) = setup();

	assert!(runtime.render(build("", Props::new(), children![]), &container).is_err());
	let mount = runtime.render(build("p", Props::new(), children!["fine"]), &container).unwrap();

	assert_eq!(surface.to_html(container), "<main><p>fine</p></main>");
	assert_eq!(mount.pass_count(), 1);
	assert_eq!(runtime.mounts().len(), 1);
}

fn row(middle: &'static str) -> Node {
	build(
		"section",
		Props::new(),
		children![
			build("p", Props::new(), children!["1"]),
			build(middle, Props::new().on("click", |_| ()), children!["2"]),
			build("p", Props::new(), children!["3"]),
		],
	)
}

#[test]
fn failed_replacement_keeps_sibling_order() {
	let (surface, container, runtime) = setup();

	runtime.render(row("span"), &container).unwrap();
	let section = surface.children(container)[0];
	let span = surface.children(section)[1];

	assert!(matches!(runtime.render(row("not a tag"), &container), Err(Error::Surface(_))));
	assert_eq!(surface.to_html(section), "<section><p>1</p><p>3</p></section>");
	assert_eq!(surface.parent(span), None);
	assert_eq!(surface.handler_count(), 0);

	runtime.render(row("div"), &container).unwrap();
	assert_eq!(surface.to_html(container), "<main><section><p>1</p><div>2</div><p>3</p></section></main>");
	assert_eq!(surface.handler_count(), 1);
}

fn item(text: &str) -> Node {
	build("li", Props::new().on("click", |_| ()), children![text])
}

#[test]
fn failed_update_still_removes_extra_children_later() {
	let (surface, container, runtime) = setup();

	runtime.render(build("ul", Props::new(), children![item("a"), item("b"), item("c")]), &container).unwrap();
	assert_eq!(surface.handler_count(), 3);

	let result = runtime.render(
		build("ul", Props::new(), children![item("a"), build("li", Props::new().with("onClick", "x"), children!["b"])]),
		&container,
	);
	assert!(matches!(result, Err(Error::MalformedProp { .. })));

	runtime.render(build("ul", Props::new(), children![item("a")]), &container).unwrap();
	assert_eq!(surface.to_html(container), "<main><ul><li>a</li></ul></main>");
	assert_eq!(surface.handler_count(), 1);
}

fn wrapped(scope: &mut Scope<'_>) -> Node {
	let tag = scope.props().get_str("tag").unwrap_or("span").to_owned();
	build(tag, Props::new(), children!["2"])
}

#[test]
fn failed_replacement_inside_a_component_keeps_sibling_order() {
	let (surface, container, runtime) = setup();

	let list = |tag: &'static str| {
		build(
			"div",
			Props::new(),
			children![
				build("p", Props::new(), children!["1"]),
				build(component(wrapped), Props::new().with("tag", tag), children![]),
				build("p", Props::new(), children!["3"]),
			],
		)
	};

	runtime.render(list("span"), &container).unwrap();
	assert!(runtime.render(list("bad tag"), &container).is_err());
	runtime.render(list("b"), &container).unwrap();

	assert_eq!(surface.to_html(container), "<main><div><p>1</p><b>2</b><p>3</p></div></main>");
	assert_eq!(runtime.mounts()[0].instance_count(), 1);
}

#[test]
fn errors_describe_themselves() {
	let error = Error::HookCount {
		component: "picker",
		expected: 3,
		found: 2,
	};
	assert_eq!(
		error.to_string(),
		"`picker` used 2 state hook(s), but 3 on its first render. Hook calls must happen in the same order on every render."
	);
	assert_eq!(Error::PassLimit(4).to_string(), "Pass limit (4) reached: state was set during each of that many consecutive render passes");
}
