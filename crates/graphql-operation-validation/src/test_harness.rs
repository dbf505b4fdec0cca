#![allow(clippy::panic)]

use async_graphql_parser::types::ExecutableDocument;

use crate::{
    visitor::{visit, RuleError, Visitor, VisitorContext, VisitorNil},
    Schema, Variables,
};

pub(crate) const TEST_SCHEMA: &str = r#"
    schema {
        query: QueryRoot
        subscription: SubscriptionRoot
    }

    interface Being {
        name(surname: Boolean): String
    }

    interface Pet {
        name(surname: Boolean): String
    }

    interface Intelligent {
        iq: Int
    }

    enum DogCommand {
        SIT
        HEEL
        DOWN
    }

    enum FurColor {
        BROWN
        BLACK
        TAN
        SPOTTED
    }

    type Dog implements Being & Pet {
        name(surname: Boolean): String
        nickname: String
        barkVolume: Int
        barks: Boolean
        doesKnowCommand(dogCommand: DogCommand): Boolean
        isHousetrained(atOtherHomes: Boolean = true): Boolean
        isAtLocation(x: Int, y: Int): Boolean
        owner: Human
    }

    type Cat implements Being & Pet {
        name(surname: Boolean): String
        nickname: String
        meows: Boolean
        meowVolume: Int
        furColor: FurColor
    }

    type Human implements Being & Intelligent {
        name(surname: Boolean): String
        pets: [Pet]
        relatives: [Human]
        iq: Int
    }

    type Alien implements Being & Intelligent {
        name(surname: Boolean): String
        iq: Int
        numEyes: Int
    }

    union CatOrDog = Cat | Dog
    union DogOrHuman = Dog | Human
    union HumanOrAlien = Human | Alien

    input ComplexInput {
        requiredField: Boolean!
        intField: Int
        stringField: String
        booleanField: Boolean
        stringListField: [String]
    }

    type ComplicatedArgs {
        intArgField(intArg: Int): String
        nonNullIntArgField(nonNullIntArg: Int!): String
        stringArgField(stringArg: String): String
        booleanArgField(booleanArg: Boolean): String
        enumArgField(enumArg: FurColor): String
        floatArgField(floatArg: Float): String
        idArgField(idArg: ID): String
        stringListArgField(stringListArg: [String]): String
        complexArgField(complexArg: ComplexInput): String
        multipleReqs(req1: Int!, req2: Int!): String
        multipleOpts(opt1: Int = 0, opt2: Int = 0): String
        multipleOptAndReq(req1: Int!, req2: Int!, opt1: Int = 0, opt2: Int = 0): String
    }

    type QueryRoot {
        being: Being
        pet: Pet
        dog: Dog
        cat: Cat
        catOrDog: CatOrDog
        dogOrHuman: DogOrHuman
        humanOrAlien: HumanOrAlien
        human(id: ID): Human
        alien: Alien
        complicatedArgs: ComplicatedArgs
    }

    type SubscriptionRoot {
        newMessage: String
        disturbance: Int
    }

    directive @onQuery on QUERY
    directive @onMutation on MUTATION
    directive @onField on FIELD
    directive @onFragmentDefinition on FRAGMENT_DEFINITION
    directive @repeatableOnField repeatable on FIELD
"#;

pub(crate) fn test_schema() -> Schema {
    match Schema::parse(TEST_SCHEMA) {
        Ok(schema) => schema,
        Err(err) => panic!("test schema must be valid: {err}"),
    }
}

pub(crate) fn validate_with<'a, V: Visitor<'a>>(
    schema: &'a Schema,
    doc: &'a ExecutableDocument,
    variables: Option<&'a Variables>,
    rule: V,
) -> Vec<RuleError> {
    let mut ctx = VisitorContext::new(schema, doc, variables);
    let mut visitor = VisitorNil.with(rule);
    visit(&mut visitor, &mut ctx, doc);
    ctx.errors
}

macro_rules! expect_passes_rule {
    ($factory:expr, $query:expr $(,)?) => {{
        let schema = crate::test_harness::test_schema();
        let doc = async_graphql_parser::parse_query($query).expect("query must parse");
        let errors = crate::test_harness::validate_with(&schema, &doc, None, $factory());
        assert!(
            errors.is_empty(),
            "expected the rule to pass, but it reported errors:\n{errors:#?}",
        );
    }};
}

macro_rules! expect_fails_rule {
    ($factory:expr, $query:expr $(,)?) => {{
        let schema = crate::test_harness::test_schema();
        let doc = async_graphql_parser::parse_query($query).expect("query must parse");
        let errors = crate::test_harness::validate_with(&schema, &doc, None, $factory());
        assert!(!errors.is_empty(), "expected the rule to fail, but it reported no errors");
    }};
}
